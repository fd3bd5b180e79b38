use crate::error::Result;
use crate::types::{AssetSnapshot, PricePoint};
use async_trait::async_trait;

/// A paginated ranked-listing source.
///
/// Implementations map their own wire format into [`AssetSnapshot`]s so the
/// services above never see provider-specific fields.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Fetch one page of the market-cap-ranked listing (1-based page index).
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<AssetSnapshot>>;
}

/// A per-asset price history source.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the trailing `days` window of samples for a provider id,
    /// ordered by timestamp.
    async fn fetch_history(&self, coin_id: &str, days: u32) -> Result<Vec<PricePoint>>;
}
