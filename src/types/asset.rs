use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ranked market snapshot for one asset.
///
/// Change fields default to `0.0` when the provider omits them; a missing
/// percentage never fails the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    /// Provider-assigned opaque id (e.g. "bitcoin").
    pub id: String,
    /// Uppercased ticker.
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    pub rank: i32,
    pub market_cap: f64,
    pub volume_24h: f64,
    #[serde(default)]
    pub change_1h: f64,
    #[serde(default)]
    pub change_24h: f64,
    #[serde(default)]
    pub change_7d: f64,
    #[serde(default)]
    pub change_30d: f64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> AssetSnapshot {
        AssetSnapshot {
            id: "bitcoin".to_string(),
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            image: "https://example.com/btc.png".to_string(),
            price: 50_000.0,
            rank: 1,
            market_cap: 1_000_000_000_000.0,
            volume_24h: 30_000_000_000.0,
            change_1h: 0.5,
            change_24h: 2.0,
            change_7d: 5.0,
            change_30d: -3.0,
            last_updated: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_snapshot_serialization_camel_case() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        assert!(json.contains("\"symbol\":\"BTC\""));
        assert!(json.contains("\"marketCap\":"));
        assert!(json.contains("\"volume24h\":"));
        assert!(json.contains("\"change1h\":0.5"));
        assert!(json.contains("\"change30d\":-3"));
        assert!(json.contains("\"lastUpdated\":"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        let back: AssetSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "bitcoin");
        assert_eq!(back.rank, 1);
        assert_eq!(back.change_7d, 5.0);
    }

    #[test]
    fn test_snapshot_missing_changes_default_to_zero() {
        let json = r#"{
            "id": "tether",
            "symbol": "USDT",
            "name": "Tether",
            "price": 1.0,
            "rank": 3,
            "marketCap": 90000000000.0,
            "volume24h": 40000000000.0,
            "lastUpdated": "2023-11-14T22:13:20Z"
        }"#;

        let snap: AssetSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.change_1h, 0.0);
        assert_eq!(snap.change_24h, 0.0);
        assert_eq!(snap.change_7d, 0.0);
        assert_eq!(snap.change_30d, 0.0);
        assert!(snap.image.is_empty());
    }
}
