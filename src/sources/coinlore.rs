use super::provider::ListingSource;
use crate::error::{AppError, Result};
use crate::types::AssetSnapshot;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const COINLORE_API_URL: &str = "https://api.coinlore.net/api";

/// CoinLore /tickers response. Numeric fields arrive as strings.
#[derive(Debug, Deserialize)]
struct TickersResponse {
    data: Vec<TickerRow>,
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    /// Slug-style id, e.g. "bitcoin".
    nameid: String,
    symbol: String,
    name: String,
    rank: i32,
    price_usd: Option<String>,
    percent_change_1h: Option<String>,
    percent_change_24h: Option<String>,
    percent_change_7d: Option<String>,
    market_cap_usd: Option<String>,
    volume24: Option<f64>,
}

fn parse_or_zero(value: &Option<String>) -> f64 {
    value
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

/// CoinLore REST client; fallback listing source when CoinGecko yields
/// nothing. No API key required.
#[derive(Clone)]
pub struct CoinLoreClient {
    client: Client,
}

impl CoinLoreClient {
    /// Create a new CoinLore client.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("coindeck/0.1 (personal cryptocurrency dashboard)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for CoinLoreClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingSource for CoinLoreClient {
    fn name(&self) -> &'static str {
        "coinlore"
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<AssetSnapshot>> {
        // CoinLore paginates by row offset rather than page index.
        let start = page.saturating_sub(1) * per_page;
        let url = format!(
            "{}/tickers/?start={}&limit={}",
            COINLORE_API_URL, start, per_page
        );

        debug!("Fetching CoinLore tickers at offset {}", start);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "CoinLore tickers at offset {} returned {}",
                start, status
            )));
        }

        let tickers: TickersResponse = response.json().await?;
        let now = Utc::now();

        let snapshots = tickers
            .data
            .into_iter()
            .filter_map(|row| {
                // A row without a parsable price is unusable.
                let price: f64 = row.price_usd.as_deref()?.parse().ok()?;

                Some(AssetSnapshot {
                    id: row.nameid,
                    symbol: row.symbol.to_uppercase(),
                    name: row.name,
                    image: String::new(), // CoinLore has no image URLs
                    price,
                    rank: row.rank,
                    market_cap: parse_or_zero(&row.market_cap_usd),
                    volume_24h: row.volume24.unwrap_or(0.0),
                    change_1h: parse_or_zero(&row.percent_change_1h),
                    change_24h: parse_or_zero(&row.percent_change_24h),
                    change_7d: parse_or_zero(&row.percent_change_7d),
                    change_30d: 0.0, // not reported by CoinLore
                    last_updated: now,
                })
            })
            .collect();

        Ok(snapshots)
    }
}
