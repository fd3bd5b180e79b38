use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single `(timestamp, price)` sample in an asset's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Stored price history for a single symbol.
///
/// Samples are ordered by timestamp; there is exactly one record per symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    /// Uppercased ticker the record is keyed by.
    pub symbol: String,
    /// Provider id the samples were fetched under.
    pub coin_id: String,
    pub samples: Vec<PricePoint>,
    pub last_updated: DateTime<Utc>,
}

impl PriceHistory {
    pub fn last_sample(&self) -> Option<&PricePoint> {
        self.samples.last()
    }
}

/// Staleness thresholds for stored history records.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    /// Whole-record freshness window in seconds.
    pub record_ttl_secs: i64,
    /// Trailing-sample freshness window in seconds.
    pub sample_ttl_secs: i64,
    /// Oldest trailing-sample age that still allows a tail patch; anything
    /// older forces a full series replace.
    pub patch_horizon_secs: i64,
    /// Downsampling bucket width in seconds.
    pub bucket_secs: i64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            record_ttl_secs: 3600,       // 1 hour
            sample_ttl_secs: 14_400,     // 4 hours
            patch_horizon_secs: 28_800,  // 8 hours
            bucket_secs: 14_400,         // one sample per 4 hours
        }
    }
}

/// Reduce a series to one sample per fixed-width time bucket, keeping the
/// first sample that lands in each bucket. Buckets are anchored at the first
/// sample, so an hourly series reduced at 4 hours keeps every 4th point.
///
/// A series already reduced at the same width passes through unchanged, so
/// re-applying the reduction is a no-op. Input is assumed ordered.
pub fn downsample(samples: &[PricePoint], bucket_secs: i64) -> Vec<PricePoint> {
    if bucket_secs <= 0 {
        return samples.to_vec();
    }
    let Some(first) = samples.first() else {
        return Vec::new();
    };

    let origin = first.timestamp.timestamp();
    let mut out: Vec<PricePoint> = Vec::with_capacity(samples.len());
    let mut current_bucket: Option<i64> = None;

    for sample in samples {
        let bucket = (sample.timestamp.timestamp() - origin).div_euclid(bucket_secs);
        if current_bucket != Some(bucket) {
            out.push(*sample);
            current_bucket = Some(bucket);
        }
    }

    out
}
