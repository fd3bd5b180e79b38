use crate::services::{Cache, DocumentStore, SymbolResolver};
use crate::sources::ListingSource;
use crate::types::AssetSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const LISTING_CACHE_KEY: &str = "top";

/// Bulk listing fetcher.
///
/// Merges ranked pages from the primary source (falling back to the
/// secondary when the primary yields nothing at all), feeds the symbol
/// resolver, upserts snapshot documents, and keeps the merged listing in a
/// TTL cache so repeated dashboard reads never refetch.
pub struct MarketService {
    primary: Arc<dyn ListingSource>,
    fallback: Option<Arc<dyn ListingSource>>,
    resolver: Arc<SymbolResolver>,
    store: Arc<DocumentStore>,
    listing: Cache<Vec<AssetSnapshot>>,
    page_size: u32,
    request_delay: Duration,
}

impl MarketService {
    pub fn new(
        primary: Arc<dyn ListingSource>,
        fallback: Option<Arc<dyn ListingSource>>,
        resolver: Arc<SymbolResolver>,
        store: Arc<DocumentStore>,
        page_size: u32,
        listing_ttl: Duration,
        request_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            primary,
            fallback,
            resolver,
            store,
            listing: Cache::new(listing_ttl),
            page_size,
            request_delay,
        })
    }

    /// Top-n ranked snapshots. Never fails: a total upstream outage degrades
    /// to the last persisted listing, then to an empty vec. The second
    /// element reports whether the in-memory listing was served as-is.
    pub async fn top_assets(&self, n: usize) -> (Vec<AssetSnapshot>, bool) {
        if let Some(mut listing) = self.listing.get(LISTING_CACHE_KEY) {
            listing.truncate(n);
            return (listing, true);
        }

        let mut fetched = self.fetch_listing(n).await;
        if !fetched.is_empty() {
            self.listing
                .set(LISTING_CACHE_KEY.to_string(), fetched.clone());
            self.store.save_snapshots(&fetched).await;
            fetched.truncate(n);
            return (fetched, false);
        }

        // Upstream gave nothing; fall back to the last persisted listing.
        let mut stored = self.store.load_listing().await;
        if !stored.is_empty() {
            info!("Serving persisted listing ({} snapshots)", stored.len());
        }
        stored.truncate(n);
        (stored, false)
    }

    /// Single snapshot by ticker, falling back to the persisted document.
    pub async fn asset(&self, symbol: &str) -> Option<AssetSnapshot> {
        let key = symbol.to_uppercase();

        if let Some(listing) = self.listing.get(LISTING_CACHE_KEY) {
            if let Some(snap) = listing.into_iter().find(|s| s.symbol == key) {
                return Some(snap);
            }
        }

        self.store.load_snapshot(&key).await
    }

    /// Force the next listing read to refetch.
    pub fn invalidate(&self) {
        self.listing.invalidate(LISTING_CACHE_KEY);
    }

    async fn fetch_listing(&self, n: usize) -> Vec<AssetSnapshot> {
        let mut merged = self.fetch_from(self.primary.as_ref(), n).await;

        if merged.is_empty() {
            if let Some(ref fallback) = self.fallback {
                warn!(
                    "{} returned no listings; trying {}",
                    self.primary.name(),
                    fallback.name()
                );
                merged = self.fetch_from(fallback.as_ref(), n).await;
            }
        }

        // Feed the resolver so history lookups can map tickers to ids.
        for snap in &merged {
            self.resolver.insert(&snap.symbol, &snap.id);
        }
        if !merged.is_empty() {
            self.resolver.mark_loaded();
        }

        merged
    }

    /// Fetch pages in rank order; a failed page is skipped so partial
    /// results from the remaining pages still come back.
    async fn fetch_from(&self, source: &dyn ListingSource, n: usize) -> Vec<AssetSnapshot> {
        let pages = (n as u32).div_ceil(self.page_size).max(1);
        let mut merged: Vec<AssetSnapshot> = Vec::with_capacity(n);

        for page in 1..=pages {
            if page > 1 {
                tokio::time::sleep(self.request_delay).await;
            }

            match source.fetch_page(page, self.page_size).await {
                Ok(rows) => {
                    debug!("{} page {} returned {} rows", source.name(), page, rows.len());
                    if rows.is_empty() {
                        // Past the end of the provider's listing.
                        break;
                    }
                    merged.extend(rows);
                }
                Err(e) => {
                    warn!("{} page {} failed: {}", source.name(), page, e);
                }
            }
        }

        merged.truncate(n);
        merged
    }
}
