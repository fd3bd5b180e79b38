use super::provider::{HistorySource, ListingSource};
use crate::error::{AppError, Result};
use crate::types::{AssetSnapshot, PricePoint};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Row of the /coins/markets listing.
#[derive(Debug, Deserialize)]
struct MarketsRow {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<i32>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_1h_in_currency: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
}

/// /coins/{id}/market_chart response; prices are [timestamp_ms, price] pairs.
#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<[f64; 2]>,
}

fn snapshot_from_row(row: MarketsRow, now: DateTime<Utc>) -> Option<AssetSnapshot> {
    // A row without a price is unusable for the dashboard.
    let price = row.current_price?;

    Some(AssetSnapshot {
        id: row.id,
        symbol: row.symbol.to_uppercase(),
        name: row.name,
        image: row.image.unwrap_or_default(),
        price,
        rank: row.market_cap_rank.unwrap_or(0),
        market_cap: row.market_cap.unwrap_or(0.0),
        volume_24h: row.total_volume.unwrap_or(0.0),
        change_1h: row.price_change_percentage_1h_in_currency.unwrap_or(0.0),
        change_24h: row.price_change_percentage_24h.unwrap_or(0.0),
        change_7d: row.price_change_percentage_7d_in_currency.unwrap_or(0.0),
        change_30d: row.price_change_percentage_30d_in_currency.unwrap_or(0.0),
        last_updated: now,
    })
}

/// CoinGecko REST client; primary listing and history source.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client.
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("coindeck/0.1 (personal cryptocurrency dashboard)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }
        request
    }
}

#[async_trait]
impl ListingSource for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<AssetSnapshot>> {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page={}&price_change_percentage=1h,24h,7d,30d",
            COINGECKO_API_URL, per_page, page
        );

        debug!("Fetching CoinGecko markets page {}", page);

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "CoinGecko markets page {} returned {}: {}",
                page,
                status,
                &body[..body.len().min(200)]
            )));
        }

        let rows: Vec<MarketsRow> = response.json().await?;
        let now = Utc::now();

        Ok(rows
            .into_iter()
            .filter_map(|row| snapshot_from_row(row, now))
            .collect())
    }
}

#[async_trait]
impl HistorySource for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_history(&self, coin_id: &str, days: u32) -> Result<Vec<PricePoint>> {
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            COINGECKO_API_URL, coin_id, days
        );

        debug!("Fetching CoinGecko market chart for {} ({} days)", coin_id, days);

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!(
                "CoinGecko market chart for {} returned {}",
                coin_id, status
            )));
        }

        let chart: MarketChart = response.json().await?;

        let mut points: Vec<PricePoint> = chart
            .prices
            .into_iter()
            .filter_map(|pair| {
                let timestamp = Utc.timestamp_millis_opt(pair[0] as i64).single()?;
                Some(PricePoint {
                    timestamp,
                    price: pair[1],
                })
            })
            .collect();

        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markets_row_deserialization() {
        let json = r#"{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
            "current_price": 50000.0,
            "market_cap": 1000000000000,
            "market_cap_rank": 1,
            "total_volume": 30000000000,
            "price_change_percentage_24h": 2.5,
            "price_change_percentage_1h_in_currency": 0.1,
            "price_change_percentage_7d_in_currency": 5.0,
            "price_change_percentage_30d_in_currency": null
        }"#;

        let row: MarketsRow = serde_json::from_str(json).unwrap();
        let snap = snapshot_from_row(row, Utc::now()).unwrap();

        assert_eq!(snap.id, "bitcoin");
        assert_eq!(snap.symbol, "BTC");
        assert_eq!(snap.rank, 1);
        assert_eq!(snap.change_24h, 2.5);
        assert_eq!(snap.change_30d, 0.0);
    }

    #[test]
    fn test_row_without_price_is_dropped() {
        let json = r#"{
            "id": "ghost-coin",
            "symbol": "gst",
            "name": "Ghost Coin",
            "current_price": null
        }"#;

        let row: MarketsRow = serde_json::from_str(json).unwrap();
        assert!(snapshot_from_row(row, Utc::now()).is_none());
    }

    #[test]
    fn test_market_chart_deserialization() {
        let json = r#"{"prices": [[1700000000000, 50000.0], [1700003600000, 50100.0]]}"#;
        let chart: MarketChart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(chart.prices[1][1], 50100.0);
    }
}
