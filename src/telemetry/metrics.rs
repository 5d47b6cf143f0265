//! Prometheus metrics

use metrics::counter;

/// Where a stored bucket came from
#[derive(Debug, Clone, Copy)]
pub enum BucketSource {
    /// Historical REST page
    Historical,
    /// Live websocket frame
    Live,
}

impl BucketSource {
    fn as_str(self) -> &'static str {
        match self {
            BucketSource::Historical => "historical",
            BucketSource::Live => "live",
        }
    }
}

/// Count a stored bucket by origin
pub fn record_bucket(source: BucketSource) {
    counter!("bitmex_buckets_stored_total", "source" => source.as_str()).increment(1);
}

/// Count a historical page that will be retried
pub fn record_fetch_retry() {
    counter!("bitmex_buckets_fetch_retries_total").increment(1);
}

/// Count a live feed (re)connection
pub fn record_reconnect() {
    counter!("bitmex_buckets_feed_reconnects_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_labels() {
        assert_eq!(BucketSource::Historical.as_str(), "historical");
        assert_eq!(BucketSource::Live.as_str(), "live");
    }
}
