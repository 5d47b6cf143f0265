//! Websocket consumer driving the gap reconciler on outages

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::{FrameOutcome, Session, FEED_CHANNEL};
use crate::history::BucketHistory;
use crate::outage::OutageTracker;
use crate::reconcile::GapReconciler;
use crate::store::BucketStore;
use crate::telemetry::{self, BucketSource};
use crate::ws::{Backoff, WsConfig, WsConn};

/// BitMEX production realtime feed URL
pub const BITMEX_WS_URL: &str = "wss://www.bitmex.com/realtime";
/// BitMEX testnet realtime feed URL
pub const BITMEX_TESTNET_WS_URL: &str = "wss://testnet.bitmex.com/realtime";

/// Configuration for the live stream consumer
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Websocket transport settings
    pub ws: WsConfig,
    /// Instrument symbol
    pub symbol: String,
}

impl StreamConfig {
    /// Config for the given instrument against production or testnet.
    pub fn new(symbol: impl Into<String>, test: bool) -> Self {
        let url = if test {
            BITMEX_TESTNET_WS_URL
        } else {
            BITMEX_WS_URL
        };
        Self {
            ws: WsConfig::new(url),
            symbol: symbol.into(),
        }
    }
}

/// Consumes the live bucket feed, persisting each completed minute.
///
/// On any connect or receive failure the consumer marks the outage,
/// reconciles the missed range through the gap reconciler, and only then
/// attempts to reconnect. The reconciler thereby doubles as the
/// outage-recovery mechanism; there is no separate replay buffer. A fresh
/// snapshot is required on every connection; streaming state is never
/// trusted across a reconnect.
pub struct LiveStream<S, H> {
    config: StreamConfig,
    store: S,
    reconciler: GapReconciler<S, H>,
    outage: OutageTracker,
}

impl<S: BucketStore, H: BucketHistory> LiveStream<S, H> {
    pub fn new(config: StreamConfig, store: S, reconciler: GapReconciler<S, H>) -> Self {
        Self {
            config,
            store,
            reconciler,
            outage: OutageTracker::new(),
        }
    }

    /// Run until cancelled. There is no other terminal state: every failure
    /// path ends in reconcile-then-reconnect.
    pub async fn run(&mut self, cancel: &CancellationToken) {
        let mut backoff = Backoff::from_config(&self.config.ws);

        while !cancel.is_cancelled() {
            let mut conn = tokio::select! {
                _ = cancel.cancelled() => break,
                connected = WsConn::connect(&self.config.ws) => match connected {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "feed connect failed");
                        self.recover(cancel).await;
                        if self.wait(&mut backoff, cancel).await {
                            break;
                        }
                        continue;
                    }
                },
            };

            self.outage.mark_recovered();
            backoff.reset();
            telemetry::record_reconnect();

            if let Err(e) = conn.send(subscribe_message(&self.config.symbol)).await {
                tracing::warn!(error = %e, "subscription send failed");
                self.recover(cancel).await;
                if self.wait(&mut backoff, cancel).await {
                    break;
                }
                continue;
            }

            tracing::info!(
                symbol = %self.config.symbol,
                channel = FEED_CHANNEL,
                "subscribed to minute bucket feed"
            );

            // Every connection starts a fresh session: the snapshot must be
            // observed again before any data frame is trusted.
            let mut session = Session::new(&self.config.symbol);

            loop {
                let received = tokio::select! {
                    _ = cancel.cancelled() => return,
                    received = conn.recv() => received,
                };

                match received {
                    Ok(text) => match session.apply(&text) {
                        FrameOutcome::Snapshot => {
                            tracing::debug!("channel snapshot observed, streaming");
                        }
                        FrameOutcome::Bucket(bucket) => self.persist(bucket).await,
                        FrameOutcome::Ignored => {}
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "feed receive failed");
                        self.recover(cancel).await;
                        break;
                    }
                }
            }

            if self.wait(&mut backoff, cancel).await {
                break;
            }
        }
    }

    async fn persist(&self, bucket: crate::bucket::TradeBucket) {
        match self.store.insert(&bucket).await {
            Ok(()) => {
                telemetry::record_bucket(BucketSource::Live);
                tracing::info!(
                    timestamp = %bucket.timestamp,
                    close = ?bucket.close,
                    volume = ?bucket.volume,
                    "live bucket stored"
                );
            }
            Err(e) => {
                // The minute is recovered by the next reconciliation pass.
                tracing::warn!(
                    error = %e,
                    timestamp = %bucket.timestamp,
                    "live bucket insert failed"
                );
            }
        }
    }

    /// Mark the outage (first failure only) and reconcile the missed range
    /// before any reconnect attempt.
    async fn recover(&mut self, cancel: &CancellationToken) {
        self.outage.mark_failure(Utc::now());

        let now = Utc::now();
        let horizon = self.outage.recovery_horizon(now);
        tracing::info!(
            outage_secs = self.outage.current_outage_duration(now).num_seconds(),
            horizon_minutes = horizon.num_minutes(),
            "reconciling after feed outage"
        );

        self.reconciler.fill_gaps(horizon, cancel).await;
    }

    /// Back off before the next connection attempt. Returns true when
    /// cancelled mid-sleep.
    async fn wait(&self, backoff: &mut Backoff, cancel: &CancellationToken) -> bool {
        let delay = backoff.next_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }
}

fn subscribe_message(symbol: &str) -> String {
    serde_json::json!({
        "op": "subscribe",
        "args": [format!("{FEED_CHANNEL}:{symbol}")],
    })
    .to_string()
}
