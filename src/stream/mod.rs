//! Live trade bucket feed
//!
//! Maintains the websocket subscription to the instrument's one-minute
//! bucket channel. Frame semantics live in [`Session`], a synchronous state
//! machine with no transport attached, so the snapshot gating and discard
//! rules are testable without a socket. [`LiveStream`] owns the connection,
//! the reconnect loop, and the outage-recovery reconciliation.

mod consumer;

pub use consumer::{LiveStream, StreamConfig, BITMEX_TESTNET_WS_URL, BITMEX_WS_URL};

use serde::Deserialize;

use crate::bucket::TradeBucket;

/// Channel carrying completed one-minute buckets
pub const FEED_CHANNEL: &str = "tradeBin1m";

/// Action marking the subscription snapshot
const ACTION_PARTIAL: &str = "partial";

/// Envelope of one inbound feed frame.
///
/// Acknowledgment frames (subscription confirmations, server info) carry
/// neither `table` nor `action`.
#[derive(Debug, Deserialize)]
struct FeedFrame {
    table: Option<String>,
    action: Option<String>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// What one frame meant, classified against the session state.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Acknowledgment, anomaly, or a data frame before the snapshot
    Ignored,
    /// Snapshot observed; incremental frames may now be trusted
    Snapshot,
    /// A completed bucket ready to persist
    Bucket(TradeBucket),
}

/// Gating state of one feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Subscribed, waiting for the channel snapshot
    AwaitingPartial,
    /// Snapshot seen; incremental frames are trusted
    Streaming,
}

/// Per-connection frame classifier.
///
/// A fresh session starts in `AwaitingPartial`: the feed's ordering
/// guarantee only holds once the channel snapshot has been observed, so any
/// data frame before that point is discarded. Sessions never survive a
/// reconnect; the consumer builds a new one per connection.
#[derive(Debug)]
pub struct Session {
    symbol: String,
    state: StreamState,
}

impl Session {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: StreamState::AwaitingPartial,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Classify one raw frame, advancing the gating state.
    ///
    /// Malformed frames, frames for other channels or instruments, and
    /// records missing their key fields are all discarded without comment;
    /// none of them are errors worth surfacing.
    pub fn apply(&mut self, raw: &str) -> FrameOutcome {
        let Ok(frame) = serde_json::from_str::<FeedFrame>(raw) else {
            return FrameOutcome::Ignored;
        };

        let (Some(table), Some(action)) = (frame.table.as_deref(), frame.action.as_deref()) else {
            return FrameOutcome::Ignored;
        };

        if table != FEED_CHANNEL {
            return FrameOutcome::Ignored;
        }

        if action == ACTION_PARTIAL {
            // The snapshot is metadata, not a new bucket.
            self.state = StreamState::Streaming;
            return FrameOutcome::Snapshot;
        }

        if self.state != StreamState::Streaming {
            return FrameOutcome::Ignored;
        }

        // The channel publishes at most one completed bucket per minute, so
        // only the last record of the payload matters.
        let Some(last) = frame.data.last() else {
            return FrameOutcome::Ignored;
        };
        let Ok(bucket) = serde_json::from_value::<TradeBucket>(last.clone()) else {
            return FrameOutcome::Ignored;
        };
        if bucket.symbol != self.symbol {
            return FrameOutcome::Ignored;
        }

        FrameOutcome::Bucket(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_frame(symbol: &str, minute: &str) -> String {
        format!(
            r#"{{"table":"tradeBin1m","action":"insert","data":[{{"timestamp":"{minute}","symbol":"{symbol}","open":6950.0,"close":6951.0,"volume":1000}}]}}"#
        )
    }

    #[test]
    fn test_ack_frames_are_ignored() {
        let mut session = Session::new("XBTUSD");
        assert_eq!(
            session.apply(r#"{"success":true,"subscribe":"tradeBin1m:XBTUSD"}"#),
            FrameOutcome::Ignored
        );
        assert_eq!(
            session.apply(r#"{"info":"Welcome to the BitMEX Realtime API."}"#),
            FrameOutcome::Ignored
        );
        assert_eq!(session.state(), StreamState::AwaitingPartial);
    }

    #[test]
    fn test_data_before_snapshot_is_discarded() {
        let mut session = Session::new("XBTUSD");
        let outcome = session.apply(&data_frame("XBTUSD", "2020-01-02T18:03:00.000Z"));
        assert_eq!(outcome, FrameOutcome::Ignored);
        assert_eq!(session.state(), StreamState::AwaitingPartial);
    }

    #[test]
    fn test_snapshot_transitions_without_inserting() {
        let mut session = Session::new("XBTUSD");
        let outcome = session.apply(
            r#"{"table":"tradeBin1m","action":"partial","data":[{"timestamp":"2020-01-02T18:02:00.000Z","symbol":"XBTUSD"}]}"#,
        );
        // The snapshot itself never yields a bucket.
        assert_eq!(outcome, FrameOutcome::Snapshot);
        assert_eq!(session.state(), StreamState::Streaming);
    }

    #[test]
    fn test_data_after_snapshot_yields_last_record() {
        let mut session = Session::new("XBTUSD");
        session.apply(r#"{"table":"tradeBin1m","action":"partial","data":[]}"#);

        let raw = r#"{"table":"tradeBin1m","action":"insert","data":[
            {"timestamp":"2020-01-02T18:03:00.000Z","symbol":"XBTUSD","close":6950.0},
            {"timestamp":"2020-01-02T18:04:00.000Z","symbol":"XBTUSD","close":6951.5}
        ]}"#;

        match session.apply(raw) {
            FrameOutcome::Bucket(bucket) => {
                assert_eq!(bucket.timestamp.to_rfc3339(), "2020-01-02T18:04:00+00:00");
            }
            other => panic!("expected a bucket, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_symbol_is_discarded() {
        let mut session = Session::new("XBTUSD");
        session.apply(r#"{"table":"tradeBin1m","action":"partial","data":[]}"#);

        let outcome = session.apply(&data_frame("ETHUSD", "2020-01-02T18:03:00.000Z"));
        assert_eq!(outcome, FrameOutcome::Ignored);
    }

    #[test]
    fn test_record_missing_timestamp_is_discarded() {
        let mut session = Session::new("XBTUSD");
        session.apply(r#"{"table":"tradeBin1m","action":"partial","data":[]}"#);

        let outcome = session.apply(
            r#"{"table":"tradeBin1m","action":"insert","data":[{"symbol":"XBTUSD","close":6950.0}]}"#,
        );
        assert_eq!(outcome, FrameOutcome::Ignored);
    }

    #[test]
    fn test_empty_data_frame_is_discarded() {
        let mut session = Session::new("XBTUSD");
        session.apply(r#"{"table":"tradeBin1m","action":"partial","data":[]}"#);

        let outcome = session.apply(r#"{"table":"tradeBin1m","action":"insert","data":[]}"#);
        assert_eq!(outcome, FrameOutcome::Ignored);
    }

    #[test]
    fn test_other_channel_is_discarded() {
        let mut session = Session::new("XBTUSD");
        session.apply(r#"{"table":"tradeBin1m","action":"partial","data":[]}"#);

        let outcome = session.apply(
            r#"{"table":"trade","action":"insert","data":[{"timestamp":"2020-01-02T18:03:00.000Z","symbol":"XBTUSD"}]}"#,
        );
        assert_eq!(outcome, FrameOutcome::Ignored);
    }

    #[test]
    fn test_malformed_json_is_discarded() {
        let mut session = Session::new("XBTUSD");
        assert_eq!(session.apply("not json at all"), FrameOutcome::Ignored);
        assert_eq!(session.apply(""), FrameOutcome::Ignored);
    }
}
