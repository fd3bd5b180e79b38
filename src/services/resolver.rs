use crate::error::{AppError, Result};
use crate::sources::ListingSource;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Maps ticker symbols to provider-specific asset ids.
///
/// The map is fed opportunistically by every bulk listing fetch, and can
/// bootstrap itself with a one-time bulk sweep when a lookup arrives before
/// any listing has been fetched. Lookups are case-insensitive; symbols are
/// normalized to uppercase internally.
pub struct SymbolResolver {
    map: DashMap<String, String>,
    source: Arc<dyn ListingSource>,
    pages: u32,
    per_page: u32,
    request_delay: Duration,
    loaded: AtomicBool,
    load_lock: Mutex<()>,
}

impl SymbolResolver {
    pub fn new(
        source: Arc<dyn ListingSource>,
        pages: u32,
        per_page: u32,
        request_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            map: DashMap::new(),
            source,
            pages,
            per_page,
            request_delay,
            loaded: AtomicBool::new(false),
            load_lock: Mutex::new(()),
        })
    }

    /// Record a symbol → id mapping.
    pub fn insert(&self, symbol: &str, id: &str) {
        self.map.insert(symbol.to_uppercase(), id.to_string());
    }

    /// Mark the mapping as populated (a bulk listing already fed it), so
    /// `resolve` skips the bootstrap sweep.
    pub fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::SeqCst);
    }

    /// Clear the populated flag; the next `resolve` miss repopulates.
    /// Existing entries are kept.
    pub fn refresh(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolve a ticker to its provider id, bootstrapping the map if this
    /// process has never populated it. An absent symbol after population is
    /// an error; ids are never guessed.
    pub async fn resolve(&self, symbol: &str) -> Result<String> {
        let key = symbol.to_uppercase();

        if let Some(id) = self.map.get(&key) {
            return Ok(id.clone());
        }

        self.ensure_loaded().await;

        self.map
            .get(&key)
            .map(|id| id.clone())
            .ok_or(AppError::UnknownSymbol(key))
    }

    /// Idempotent bulk load: only the first caller fetches, concurrent
    /// callers wait on it, and later calls are no-ops until `refresh`.
    pub async fn ensure_loaded(&self) {
        if self.loaded.load(Ordering::SeqCst) {
            return;
        }

        let _guard = self.load_lock.lock().await;
        if self.loaded.load(Ordering::SeqCst) {
            return;
        }

        info!(
            "Populating symbol-to-id mapping from {} ({} pages)",
            self.source.name(),
            self.pages
        );

        for page in 1..=self.pages {
            if page > 1 {
                tokio::time::sleep(self.request_delay).await;
            }
            match self.source.fetch_page(page, self.per_page).await {
                Ok(rows) => {
                    for row in rows {
                        self.insert(&row.symbol, &row.id);
                    }
                }
                Err(e) => {
                    warn!("Symbol mapping page {} failed: {}", page, e);
                }
            }
        }

        // The sweep runs at most once per process even if pages failed;
        // refresh() re-arms it explicitly.
        self.loaded.store(true, Ordering::SeqCst);
        info!("Symbol mapping populated with {} entries", self.map.len());
    }
}
