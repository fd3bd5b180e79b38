use crate::error::{AppError, Result};
use crate::services::{DocumentStore, SymbolResolver};
use crate::sources::HistorySource;
use crate::types::{downsample, FreshnessPolicy, PriceHistory, PricePoint};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Outcome of evaluating one stored record against the freshness policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Record is fresh; serve it without touching upstream.
    Hit,
    /// Only the trailing sample is stale; replace it and append newer points.
    Patch,
    /// Record is absent, empty, or too old; replace the entire series.
    Replace,
}

impl RefreshPlan {
    /// Decide how to serve a history read given the stored record.
    pub fn evaluate(
        record: Option<&PriceHistory>,
        now: DateTime<Utc>,
        policy: &FreshnessPolicy,
    ) -> Self {
        let Some(record) = record else {
            return RefreshPlan::Replace;
        };
        let Some(last) = record.last_sample() else {
            return RefreshPlan::Replace;
        };

        let record_age = now.signed_duration_since(record.last_updated).num_seconds();
        if record_age < policy.record_ttl_secs {
            return RefreshPlan::Hit;
        }

        let tail_age = now.signed_duration_since(last.timestamp).num_seconds();
        if tail_age < policy.sample_ttl_secs {
            return RefreshPlan::Hit;
        }
        if tail_age < policy.patch_horizon_secs {
            return RefreshPlan::Patch;
        }

        RefreshPlan::Replace
    }
}

/// Merge freshly fetched samples into the stored record according to the plan.
///
/// A patch keeps every stored sample except the stale trailing one and
/// extends with fetched points strictly newer than the new tail, so earlier
/// samples survive byte-identical and timestamps stay monotonic. Any other
/// plan replaces the series wholesale.
pub fn apply_plan(
    plan: RefreshPlan,
    stored: Option<&PriceHistory>,
    symbol: &str,
    coin_id: String,
    fresh: Vec<PricePoint>,
    now: DateTime<Utc>,
) -> PriceHistory {
    let samples = match (plan, stored) {
        (RefreshPlan::Patch, Some(record)) if !record.samples.is_empty() => {
            let mut samples = record.samples[..record.samples.len() - 1].to_vec();
            let tail = samples.last().map(|p| p.timestamp);
            samples.extend(fresh.into_iter().filter(|p| match tail {
                Some(t) => p.timestamp > t,
                None => true,
            }));
            samples
        }
        _ => fresh,
    };

    PriceHistory {
        symbol: symbol.to_string(),
        coin_id,
        samples,
        last_updated: now,
    }
}

/// Published whenever a symbol's stored history changes.
#[derive(Debug, Clone)]
pub struct HistoryUpdate {
    pub symbol: String,
    pub points: usize,
}

/// Result of a history read.
#[derive(Debug, Clone)]
pub struct HistoryReading {
    pub samples: Vec<PricePoint>,
    pub last_updated: Option<DateTime<Utc>>,
    /// True when the stored record was served without an upstream call.
    pub cached: bool,
}

/// Freshness-gated price history fetcher.
///
/// Keeps one record per symbol in memory (mirrored to the document store)
/// and only calls upstream when the record is stale. Reads are best-effort:
/// on any failure the last known-good series is returned, or an empty one.
pub struct HistoryService {
    source: Arc<dyn HistorySource>,
    resolver: Arc<SymbolResolver>,
    store: Arc<DocumentStore>,
    records: DashMap<String, PriceHistory>,
    policy: FreshnessPolicy,
    history_days: u32,
    tx: broadcast::Sender<HistoryUpdate>,
}

impl HistoryService {
    pub fn new(
        source: Arc<dyn HistorySource>,
        resolver: Arc<SymbolResolver>,
        store: Arc<DocumentStore>,
        policy: FreshnessPolicy,
        history_days: u32,
    ) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(256);

        Arc::new(Self {
            source,
            resolver,
            store,
            records: DashMap::new(),
            policy,
            history_days,
            tx,
        })
    }

    /// Subscribe to history updates. Completed refreshes are announced here;
    /// readers never wait on the producer.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryUpdate> {
        self.tx.subscribe()
    }

    /// Return the price history for a symbol, refreshing from upstream only
    /// when the stored record is stale.
    pub async fn history(&self, symbol: &str) -> HistoryReading {
        let key = symbol.to_uppercase();

        // First access after a restart pulls the persisted record in.
        if !self.records.contains_key(&key) {
            if let Some(record) = self.store.load_history(&key).await {
                debug!(
                    "Loaded stored history for {} ({} samples)",
                    key,
                    record.samples.len()
                );
                self.records.insert(key.clone(), record);
            }
        }

        let stored = self.records.get(&key).map(|r| r.clone());
        let plan = RefreshPlan::evaluate(stored.as_ref(), Utc::now(), &self.policy);

        if let (RefreshPlan::Hit, Some(record)) = (plan, &stored) {
            debug!("Serving cached history for {}", key);
            return HistoryReading {
                samples: record.samples.clone(),
                last_updated: Some(record.last_updated),
                cached: true,
            };
        }

        match self.refresh(&key, stored.as_ref(), plan).await {
            Ok(record) => {
                let reading = HistoryReading {
                    samples: record.samples.clone(),
                    last_updated: Some(record.last_updated),
                    cached: false,
                };
                // Wholesale per-key replace; concurrent refreshes are
                // redundant fetches, not a correctness problem.
                self.records.insert(key, record);
                reading
            }
            Err(AppError::UnknownSymbol(sym)) => {
                warn!("No provider id for {}; returning stored or empty history", sym);
                Self::degraded(stored)
            }
            Err(e) => {
                warn!("History refresh for {} failed: {}; serving stored data", key, e);
                Self::degraded(stored)
            }
        }
    }

    fn degraded(stored: Option<PriceHistory>) -> HistoryReading {
        match stored {
            Some(record) => HistoryReading {
                samples: record.samples,
                last_updated: Some(record.last_updated),
                cached: false,
            },
            None => HistoryReading {
                samples: Vec::new(),
                last_updated: None,
                cached: false,
            },
        }
    }

    /// Fetch upstream and fold the result into the stored record.
    async fn refresh(
        &self,
        symbol: &str,
        stored: Option<&PriceHistory>,
        plan: RefreshPlan,
    ) -> Result<PriceHistory> {
        let coin_id = match stored {
            // Reuse the id the record was fetched under; resolve otherwise.
            Some(record) if !record.coin_id.is_empty() => record.coin_id.clone(),
            _ => self.resolver.resolve(symbol).await?,
        };

        let fetched = self.source.fetch_history(&coin_id, self.history_days).await?;
        if fetched.is_empty() {
            return Err(AppError::Upstream(format!(
                "{} returned an empty series for {}",
                self.source.name(),
                coin_id
            )));
        }

        let fresh = downsample(&fetched, self.policy.bucket_secs);
        let record = apply_plan(plan, stored, symbol, coin_id, fresh, Utc::now());

        info!(
            "Refreshed history for {} ({:?}, {} samples)",
            symbol,
            plan,
            record.samples.len()
        );

        self.store.save_history(&record).await;
        let _ = self.tx.send(HistoryUpdate {
            symbol: record.symbol.clone(),
            points: record.samples.len(),
        });

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(ts: i64, price: f64) -> PricePoint {
        PricePoint {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            price,
        }
    }

    fn record(samples: Vec<PricePoint>, last_updated: i64) -> PriceHistory {
        PriceHistory {
            symbol: "BTC".to_string(),
            coin_id: "bitcoin".to_string(),
            samples,
            last_updated: Utc.timestamp_opt(last_updated, 0).unwrap(),
        }
    }

    fn policy() -> FreshnessPolicy {
        FreshnessPolicy::default()
    }

    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    // =========================================================================
    // RefreshPlan::evaluate
    // =========================================================================

    #[test]
    fn test_no_record_replaces() {
        assert_eq!(
            RefreshPlan::evaluate(None, now(), &policy()),
            RefreshPlan::Replace
        );
    }

    #[test]
    fn test_empty_record_replaces() {
        let rec = record(vec![], NOW);
        assert_eq!(
            RefreshPlan::evaluate(Some(&rec), now(), &policy()),
            RefreshPlan::Replace
        );
    }

    #[test]
    fn test_recently_updated_record_hits() {
        // Updated 30 minutes ago; trailing sample much older.
        let rec = record(vec![point(NOW - 86_400, 1.0)], NOW - 1800);
        assert_eq!(
            RefreshPlan::evaluate(Some(&rec), now(), &policy()),
            RefreshPlan::Hit
        );
    }

    #[test]
    fn test_fresh_trailing_sample_hits() {
        // Record written 2 hours ago, but its tail sample is 3 hours old,
        // inside the 4-hour sample window.
        let rec = record(vec![point(NOW - 10_800, 1.0)], NOW - 7200);
        assert_eq!(
            RefreshPlan::evaluate(Some(&rec), now(), &policy()),
            RefreshPlan::Hit
        );
    }

    #[test]
    fn test_stale_tail_inside_horizon_patches() {
        // Tail is 6 hours old: past the 4-hour sample window, inside the
        // 8-hour patch horizon.
        let rec = record(vec![point(NOW - 21_600, 1.0)], NOW - 21_600);
        assert_eq!(
            RefreshPlan::evaluate(Some(&rec), now(), &policy()),
            RefreshPlan::Patch
        );
    }

    #[test]
    fn test_ancient_tail_replaces() {
        // Tail is 2 days old; the whole series is stale.
        let rec = record(vec![point(NOW - 172_800, 1.0)], NOW - 172_800);
        assert_eq!(
            RefreshPlan::evaluate(Some(&rec), now(), &policy()),
            RefreshPlan::Replace
        );
    }

    // =========================================================================
    // apply_plan
    // =========================================================================

    #[test]
    fn test_patch_preserves_earlier_samples() {
        let stored = record(
            vec![
                point(NOW - 43_200, 1.0),
                point(NOW - 28_800, 2.0),
                point(NOW - 21_600, 3.0), // stale tail
            ],
            NOW - 21_600,
        );
        let fresh = vec![
            point(NOW - 28_800, 2.5), // overlaps a kept sample; dropped
            point(NOW - 21_600, 3.5),
            point(NOW - 7200, 4.0),
        ];

        let merged = apply_plan(
            RefreshPlan::Patch,
            Some(&stored),
            "BTC",
            "bitcoin".to_string(),
            fresh,
            now(),
        );

        // The two earlier samples survive unchanged; the stale tail is
        // replaced by the refetched value at its timestamp plus newer data.
        assert_eq!(merged.samples.len(), 4);
        assert_eq!(merged.samples[0], point(NOW - 43_200, 1.0));
        assert_eq!(merged.samples[1], point(NOW - 28_800, 2.0));
        assert_eq!(merged.samples[2], point(NOW - 21_600, 3.5));
        assert_eq!(merged.samples[3], point(NOW - 7200, 4.0));
    }

    #[test]
    fn test_patch_keeps_timestamps_monotonic() {
        let stored = record(
            vec![point(NOW - 28_800, 1.0), point(NOW - 21_600, 2.0)],
            NOW - 21_600,
        );
        let fresh = vec![point(NOW - 36_000, 0.5), point(NOW - 3600, 3.0)];

        let merged = apply_plan(
            RefreshPlan::Patch,
            Some(&stored),
            "BTC",
            "bitcoin".to_string(),
            fresh,
            now(),
        );

        let timestamps: Vec<_> = merged.samples.iter().map(|p| p.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
        // The older-than-tail fetched point was discarded.
        assert_eq!(merged.samples.len(), 2);
    }

    #[test]
    fn test_patch_single_sample_record_falls_back_to_fetched() {
        let stored = record(vec![point(NOW - 21_600, 1.0)], NOW - 21_600);
        let fresh = vec![point(NOW - 14_400, 2.0), point(NOW - 7200, 3.0)];

        let merged = apply_plan(
            RefreshPlan::Patch,
            Some(&stored),
            "BTC",
            "bitcoin".to_string(),
            fresh.clone(),
            now(),
        );

        assert_eq!(merged.samples, fresh);
    }

    #[test]
    fn test_replace_discards_stored_samples() {
        let stored = record(vec![point(NOW - 172_800, 1.0)], NOW - 172_800);
        let fresh = vec![point(NOW - 14_400, 2.0)];

        let merged = apply_plan(
            RefreshPlan::Replace,
            Some(&stored),
            "BTC",
            "bitcoin".to_string(),
            fresh.clone(),
            now(),
        );

        assert_eq!(merged.samples, fresh);
        assert_eq!(merged.last_updated, now());
    }
}
