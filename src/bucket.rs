//! Trade bucket record shared by the historical API and the live feed

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV aggregate for one instrument over one UTC calendar minute.
///
/// Field names map onto the BitMEX wire format, which is identical between
/// the `trade/bucketed` REST response and the `tradeBin1m` websocket payload.
/// `(timestamp, symbol)` identifies a bucket; everything else is nullable on
/// the wire (thin minutes omit prices entirely).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeBucket {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    #[serde(default)]
    pub open: Option<Decimal>,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub close: Option<Decimal>,
    #[serde(default)]
    pub trades: Option<i64>,
    #[serde(default)]
    pub volume: Option<i64>,
    #[serde(default)]
    pub vwap: Option<Decimal>,
    #[serde(default)]
    pub last_size: Option<i64>,
    #[serde(default)]
    pub turnover: Option<i64>,
    #[serde(default)]
    pub home_notional: Option<Decimal>,
    #[serde(default)]
    pub foreign_notional: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_full_record() {
        let json = r#"{
            "timestamp": "2020-01-02T18:03:00.000Z",
            "symbol": "XBTUSD",
            "open": 6950.5,
            "high": 6951.0,
            "low": 6949.5,
            "close": 6950.0,
            "trades": 42,
            "volume": 120000,
            "vwap": 6950.3,
            "lastSize": 500,
            "turnover": 1726500000,
            "homeNotional": 17.265,
            "foreignNotional": 120000.0
        }"#;

        let bucket: TradeBucket = serde_json::from_str(json).unwrap();
        assert_eq!(bucket.symbol, "XBTUSD");
        assert_eq!(bucket.timestamp.to_rfc3339(), "2020-01-02T18:03:00+00:00");
        assert_eq!(bucket.open, Some(dec!(6950.5)));
        assert_eq!(bucket.close, Some(dec!(6950.0)));
        assert_eq!(bucket.trades, Some(42));
        assert_eq!(bucket.last_size, Some(500));
        assert_eq!(bucket.home_notional, Some(dec!(17.265)));
    }

    #[test]
    fn test_parse_thin_minute() {
        // Minutes with no trades carry only the key fields.
        let json = r#"{
            "timestamp": "2020-01-02T18:04:00.000Z",
            "symbol": "XBTUSD",
            "open": null,
            "close": null
        }"#;

        let bucket: TradeBucket = serde_json::from_str(json).unwrap();
        assert_eq!(bucket.symbol, "XBTUSD");
        assert!(bucket.open.is_none());
        assert!(bucket.trades.is_none());
        assert!(bucket.foreign_notional.is_none());
    }

    #[test]
    fn test_missing_timestamp_is_rejected() {
        let json = r#"{"symbol": "XBTUSD", "close": 6950.0}"#;
        assert!(serde_json::from_str::<TradeBucket>(json).is_err());
    }

    #[test]
    fn test_missing_symbol_is_rejected() {
        let json = r#"{"timestamp": "2020-01-02T18:03:00.000Z", "close": 6950.0}"#;
        assert!(serde_json::from_str::<TradeBucket>(json).is_err());
    }
}
