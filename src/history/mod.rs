//! Historical trade bucket API
//!
//! Paginated access to BitMEX `GET /api/v1/trade/bucketed` for the gap
//! reconciler. Both the production and testnet endpoints are public; no
//! request signing is required for bucketed trades.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::bucket::TradeBucket;

/// BitMEX production REST base URL
pub const BITMEX_REST_URL: &str = "https://www.bitmex.com";
/// BitMEX testnet REST base URL
pub const BITMEX_TESTNET_REST_URL: &str = "https://testnet.bitmex.com";

/// Errors from the historical API.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Request could not be sent or timed out
    #[error("request failed: {0}")]
    Request(String),
    /// Non-success HTTP status
    #[error("api error: {status} - {body}")]
    Api { status: u16, body: String },
    /// Response body did not decode as bucket records
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Interface the gap reconciler requires from the historical API.
#[async_trait]
pub trait BucketHistory: Send + Sync {
    /// Fetch up to `count` one-minute buckets beginning at `start`,
    /// oldest first.
    async fn fetch_window(
        &self,
        start: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<TradeBucket>, HistoryError>;
}

/// Configuration for the historical client
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// REST base URL
    pub base_url: String,
    /// Instrument symbol
    pub symbol: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            base_url: BITMEX_REST_URL.to_string(),
            symbol: "XBTUSD".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HistoryConfig {
    /// Config for the given instrument against production or testnet.
    pub fn new(symbol: impl Into<String>, test: bool) -> Self {
        let base_url = if test {
            BITMEX_TESTNET_REST_URL
        } else {
            BITMEX_REST_URL
        };
        Self {
            base_url: base_url.to_string(),
            symbol: symbol.into(),
            ..Default::default()
        }
    }
}

/// Client for the BitMEX bucketed-trades endpoint.
#[derive(Clone)]
pub struct BitmexHistory {
    config: HistoryConfig,
    client: Client,
}

impl BitmexHistory {
    pub fn new(config: HistoryConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl BucketHistory for BitmexHistory {
    async fn fetch_window(
        &self,
        start: DateTime<Utc>,
        count: u32,
    ) -> Result<Vec<TradeBucket>, HistoryError> {
        let url = format!("{}/api/v1/trade/bucketed", self.config.base_url);

        // The endpoint takes the window start as a minute-precision UTC
        // instant inside a JSON filter, e.g. {"startTime":"2020-01-02 18:03"}.
        let start_str = start.format("%Y-%m-%d %H:%M").to_string();
        let filter = serde_json::json!({ "startTime": start_str }).to_string();
        let count_str = count.to_string();

        tracing::debug!(start = %start_str, count, "requesting historical buckets");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", self.config.symbol.as_str()),
                ("binSize", "1m"),
                ("partial", "false"),
                ("reverse", "false"),
                ("count", count_str.as_str()),
                ("filter", filter.as_str()),
            ])
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(HistoryError::Api { status, body });
        }

        let buckets: Vec<TradeBucket> = response
            .json()
            .await
            .map_err(|e| HistoryError::Decode(e.to_string()))?;

        tracing::debug!(start = %start_str, returned = buckets.len(), "historical page received");
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_selects_base_url() {
        let live = HistoryConfig::new("XBTUSD", false);
        assert_eq!(live.base_url, BITMEX_REST_URL);

        let test = HistoryConfig::new("XBTUSD", true);
        assert_eq!(test.base_url, BITMEX_TESTNET_REST_URL);
        assert_eq!(test.symbol, "XBTUSD");
    }

    #[test]
    fn test_config_default() {
        let config = HistoryConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.base_url, BITMEX_REST_URL);
    }
}
