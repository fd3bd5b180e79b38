use crate::AppState;
use axum::{extract::Path, response::Html, routing::get, Router};

/// Standalone chart page template; `__SYMBOL__` is substituted per request.
const CHART_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>__SYMBOL__ - coindeck</title>
  <script src="https://unpkg.com/lightweight-charts@4.1.0/dist/lightweight-charts.standalone.production.js"></script>
  <style>
    body { margin: 0; background: #131722; color: #d1d4dc; font-family: sans-serif; }
    h1 { font-size: 16px; padding: 12px 16px; margin: 0; }
    #chart { position: absolute; top: 48px; bottom: 0; left: 0; right: 0; }
    #empty { padding: 16px; color: #787b86; }
  </style>
</head>
<body>
  <h1>__SYMBOL__ / USD</h1>
  <div id="chart"></div>
  <script>
    const chart = LightweightCharts.createChart(document.getElementById('chart'), {
      layout: { background: { color: '#131722' }, textColor: '#d1d4dc' },
      grid: { vertLines: { color: '#1e222d' }, horzLines: { color: '#1e222d' } },
      timeScale: { timeVisible: true },
    });
    const series = chart.addLineSeries({ color: '#2962ff', lineWidth: 2 });

    fetch('/api/history/__SYMBOL__')
      .then((res) => res.json())
      .then((body) => {
        const samples = body.data.samples || [];
        if (samples.length === 0) {
          document.getElementById('chart').innerHTML =
            '<div id="empty">No history available for __SYMBOL__ yet.</div>';
          return;
        }
        series.setData(samples.map((s) => ({
          time: Math.floor(Date.parse(s.timestamp) / 1000),
          value: s.price,
        })));
        chart.timeScale().fitContent();
      });

    window.addEventListener('resize', () => {
      const el = document.getElementById('chart');
      chart.resize(el.clientWidth, el.clientHeight);
    });
  </script>
</body>
</html>
"#;

/// GET /chart/:symbol
///
/// Renders the symbol's stored series as a line chart in the browser, fed by
/// the JSON history endpoint.
async fn chart_page(Path(symbol): Path<String>) -> Html<String> {
    // Tickers are plain alphanumerics; anything else is stripped before the
    // symbol is substituted into markup.
    let safe: String = symbol
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(12)
        .collect();

    Html(CHART_PAGE.replace("__SYMBOL__", &safe))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:symbol", get(chart_page))
}
