use crate::services::{HistoryService, MarketService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Best-effort background refresher.
///
/// One task: refetch the listing, warm history for the top symbols with a
/// fixed per-symbol delay, sleep, repeat. Failures are logged and the loop
/// continues; request handlers never wait on it.
pub struct Refresher {
    market: Arc<MarketService>,
    history: Arc<HistoryService>,
    top_n: usize,
    warm_limit: usize,
    interval: Duration,
    request_delay: Duration,
}

impl Refresher {
    pub fn new(
        market: Arc<MarketService>,
        history: Arc<HistoryService>,
        top_n: usize,
        warm_limit: usize,
        interval: Duration,
        request_delay: Duration,
    ) -> Self {
        Self {
            market,
            history,
            top_n,
            warm_limit,
            interval,
            request_delay,
        }
    }

    /// Spawn the refresh loop.
    pub fn spawn(self) {
        tokio::spawn(async move {
            loop {
                self.run_cycle().await;
                tokio::time::sleep(self.interval).await;
            }
        });
    }

    /// One cycle: listing first, then history warm-up for the top symbols.
    async fn run_cycle(&self) {
        self.market.invalidate();
        let (listing, _) = self.market.top_assets(self.top_n).await;

        if listing.is_empty() {
            warn!("Refresh cycle fetched no listings; skipping history warm-up");
            return;
        }
        info!("Refreshed listing with {} snapshots", listing.len());

        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for snap in listing.iter().take(self.warm_limit) {
            let reading = self.history.history(&snap.symbol).await;
            if reading.samples.is_empty() {
                failed += 1;
            } else {
                succeeded += 1;
            }
            // Fixed delay keeps the free-tier rate limiter happy.
            tokio::time::sleep(self.request_delay).await;
        }

        info!(
            "History warm-up complete: {} succeeded, {} failed",
            succeeded, failed
        );
    }
}
