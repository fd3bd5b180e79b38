use crate::types::FreshnessPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Redis URL for the document store.
    pub redis_url: Option<String>,
    /// CoinGecko demo API key (optional).
    pub coingecko_api_key: Option<String>,
    /// Number of top-ranked assets the dashboard tracks.
    pub top_n: usize,
    /// Listing page size for upstream requests.
    pub page_size: u32,
    /// How many top symbols the background task warms history for.
    pub warm_limit: usize,
    /// Trailing history window requested from upstream, in days.
    pub history_days: u32,
    /// In-memory listing cache lifetime.
    pub listing_ttl: Duration,
    /// Background refresh cycle interval.
    pub refresh_interval: Duration,
    /// Fixed delay between consecutive upstream requests.
    pub request_delay: Duration,
    /// Staleness thresholds for stored history records.
    pub freshness: FreshnessPolicy,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = FreshnessPolicy::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3002),
            redis_url: env::var("REDIS_URL")
                .ok()
                .or_else(|| Some("redis://127.0.0.1:6379".to_string())),
            coingecko_api_key: env::var("COINGECKO_API_KEY").ok(),
            top_n: env_parse("TOP_N", 500),
            page_size: env_parse("PAGE_SIZE", 100),
            warm_limit: env_parse("WARM_LIMIT", 10),
            history_days: env_parse("HISTORY_DAYS", 7),
            listing_ttl: Duration::from_secs(env_parse("LISTING_TTL_SECS", 300)),
            refresh_interval: Duration::from_secs(env_parse("REFRESH_INTERVAL_SECS", 900)),
            request_delay: Duration::from_millis(env_parse("REQUEST_DELAY_MS", 1000)),
            freshness: FreshnessPolicy {
                record_ttl_secs: env_parse("RECORD_TTL_SECS", defaults.record_ttl_secs),
                sample_ttl_secs: env_parse("SAMPLE_TTL_SECS", defaults.sample_ttl_secs),
                patch_horizon_secs: env_parse("PATCH_HORIZON_SECS", defaults.patch_horizon_secs),
                bucket_secs: env_parse("SAMPLE_BUCKET_SECS", defaults.bucket_secs),
            },
        }
    }

    /// Number of listing pages needed to cover `top_n`.
    pub fn listing_pages(&self) -> u32 {
        (self.top_n as u32).div_ceil(self.page_size).max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3002,
            redis_url: Some("redis://127.0.0.1:6379".to_string()),
            coingecko_api_key: None,
            top_n: 500,
            page_size: 100,
            warm_limit: 10,
            history_days: 7,
            listing_ttl: Duration::from_secs(300),
            refresh_interval: Duration::from_secs(900),
            request_delay: Duration::from_millis(1000),
            freshness: FreshnessPolicy::default(),
        }
    }

    #[test]
    fn test_listing_pages_covers_top_n() {
        let mut config = manual_config();
        assert_eq!(config.listing_pages(), 5);

        config.top_n = 101;
        assert_eq!(config.listing_pages(), 2);

        config.top_n = 1;
        assert_eq!(config.listing_pages(), 1);
    }

    #[test]
    fn test_listing_pages_never_zero() {
        let mut config = manual_config();
        config.top_n = 0;
        assert_eq!(config.listing_pages(), 1);
    }

    #[test]
    fn test_config_defaults() {
        let config = manual_config();
        assert_eq!(config.port, 3002);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.freshness.record_ttl_secs, 3600);
        assert_eq!(config.freshness.sample_ttl_secs, 14_400);
    }
}
