use crate::types::{AssetSnapshot, PriceHistory};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Redis key prefixes for the document collections.
const HISTORY_PREFIX: &str = "coindeck:history:";
const SNAPSHOT_PREFIX: &str = "coindeck:snapshot:";
const LISTING_KEY: &str = "coindeck:listing";

/// Snapshot documents and the listing index expire after a day.
const SNAPSHOT_TTL_SECS: u64 = 86_400;

/// Redis-backed JSON document store.
///
/// One history document and one snapshot document per symbol, plus a ranked
/// symbol index for the listing. When Redis is unavailable the store runs as
/// a no-op and reads degrade to upstream data only.
pub struct DocumentStore {
    redis: RwLock<Option<ConnectionManager>>,
}

impl DocumentStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            redis: RwLock::new(None),
        })
    }

    /// Connect to Redis; logs and stays disconnected on failure.
    pub async fn connect(&self, redis_url: &str) {
        match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    info!("Document store connected to Redis");
                    *self.redis.write().await = Some(conn);
                }
                Err(e) => {
                    warn!(
                        "Failed to connect document store to Redis: {}. Running without persistence.",
                        e
                    );
                }
            },
            Err(e) => {
                warn!("Invalid Redis URL for document store: {}", e);
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.redis.read().await.is_some()
    }

    /// Upsert the history document for a symbol.
    pub async fn save_history(&self, record: &PriceHistory) {
        let conn_guard = self.redis.read().await;
        let Some(ref conn) = *conn_guard else {
            return;
        };
        let mut conn = conn.clone();

        let key = format!("{}{}", HISTORY_PREFIX, record.symbol);
        match serde_json::to_string(record) {
            Ok(json) => {
                if let Err(e) = conn.set::<_, _, ()>(&key, json).await {
                    error!("Failed to save history for {}: {}", record.symbol, e);
                }
            }
            Err(e) => {
                error!("Failed to serialize history for {}: {}", record.symbol, e);
            }
        }
    }

    /// Load the history document for a symbol, if one exists.
    pub async fn load_history(&self, symbol: &str) -> Option<PriceHistory> {
        let conn_guard = self.redis.read().await;
        let Some(ref conn) = *conn_guard else {
            return None;
        };
        let mut conn = conn.clone();

        let key = format!("{}{}", HISTORY_PREFIX, symbol);
        let json: Option<String> = conn.get(&key).await.ok()?;
        let json = json?;

        match serde_json::from_str(&json) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Discarding unreadable history document for {}: {}", symbol, e);
                None
            }
        }
    }

    /// Upsert the snapshot documents and the ranked listing index.
    pub async fn save_snapshots(&self, snapshots: &[AssetSnapshot]) {
        let conn_guard = self.redis.read().await;
        let Some(ref conn) = *conn_guard else {
            return;
        };
        let mut conn = conn.clone();

        let mut pipe = redis::pipe();
        for snap in snapshots {
            if let Ok(json) = serde_json::to_string(snap) {
                let key = format!("{}{}", SNAPSHOT_PREFIX, snap.symbol);
                pipe.set_ex(&key, json, SNAPSHOT_TTL_SECS);
            }
        }

        let order: Vec<&str> = snapshots.iter().map(|s| s.symbol.as_str()).collect();
        if let Ok(json) = serde_json::to_string(&order) {
            pipe.set_ex(LISTING_KEY, json, SNAPSHOT_TTL_SECS);
        }

        if let Err(e) = pipe.query_async::<_, ()>(&mut conn).await {
            error!("Failed to save snapshots: {}", e);
        } else {
            debug!("Saved {} snapshot documents", snapshots.len());
        }
    }

    /// Load the snapshot document for a symbol, if one exists.
    pub async fn load_snapshot(&self, symbol: &str) -> Option<AssetSnapshot> {
        let conn_guard = self.redis.read().await;
        let Some(ref conn) = *conn_guard else {
            return None;
        };
        let mut conn = conn.clone();

        let key = format!("{}{}", SNAPSHOT_PREFIX, symbol);
        let json: Option<String> = conn.get(&key).await.ok()?;
        serde_json::from_str(&json?).ok()
    }

    /// Load the persisted listing in rank order. Symbols whose snapshot
    /// document has expired are skipped.
    pub async fn load_listing(&self) -> Vec<AssetSnapshot> {
        let conn_guard = self.redis.read().await;
        let Some(ref conn) = *conn_guard else {
            return Vec::new();
        };
        let mut conn = conn.clone();

        let json: Option<String> = match conn.get(LISTING_KEY).await {
            Ok(value) => value,
            Err(e) => {
                debug!("Failed to read listing index: {}", e);
                return Vec::new();
            }
        };
        drop(conn_guard);
        let Some(json) = json else {
            return Vec::new();
        };

        let order: Vec<String> = match serde_json::from_str(&json) {
            Ok(order) => order,
            Err(e) => {
                debug!("Discarding unreadable listing index: {}", e);
                return Vec::new();
            }
        };

        let mut listing = Vec::with_capacity(order.len());
        for symbol in &order {
            if let Some(snap) = self.load_snapshot(symbol).await {
                listing.push(snap);
            }
        }
        listing
    }
}
