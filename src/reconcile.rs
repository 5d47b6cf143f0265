//! Gap reconciliation between the store and the historical API
//!
//! Drains every minute bucket missing between the last persisted minute and
//! the present, one bounded page at a time. Runs once at startup with a
//! long horizon and again after every live-feed outage with a horizon sized
//! by the outage tracker.

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use crate::history::BucketHistory;
use crate::store::{BucketStore, StoreError};
use crate::telemetry::{self, BucketSource};

/// Buckets per historical page; one page spans two hours of minutes.
pub const PAGE_SIZE: u32 = 120;

/// Pacing and horizon parameters for reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Look-back for the startup catch-up pass.
    pub startup_horizon: Duration,
    /// Fixed delay between page requests, successful or not. Keeps the
    /// request rate under the API limit.
    pub page_pace: std::time::Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            startup_horizon: Duration::days(21),
            page_pace: std::time::Duration::from_secs(2),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FillReport {
    /// Pages fetched and fully archived.
    pub pages: u32,
    /// Buckets inserted across all pages.
    pub inserted: u64,
    /// Whether the pass was cut short by cancellation.
    pub cancelled: bool,
}

/// Fills gaps in the stored minute series from the historical API.
pub struct GapReconciler<S, H> {
    store: S,
    history: H,
    config: ReconcileConfig,
}

impl<S: BucketStore, H: BucketHistory> GapReconciler<S, H> {
    pub fn new(store: S, history: H, config: ReconcileConfig) -> Self {
        Self {
            store,
            history,
            config,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Drain all buckets missing between
    /// `max(now - horizon, last stored minute) + 1 minute` and the present,
    /// where "the present" is re-sampled every iteration to pick up minutes
    /// that complete while the pass runs.
    ///
    /// A failed fetch or insert leaves the window where it is; the same
    /// window is retried on the next iteration, indefinitely. An empty
    /// store performs no catch-up at all: backfilling an unbounded history
    /// from nothing is deliberately out of scope.
    pub async fn fill_gaps(&self, horizon: Duration, cancel: &CancellationToken) -> FillReport {
        let mut report = FillReport::default();
        let mut now = Utc::now();

        tracing::info!(
            horizon_minutes = horizon.num_minutes(),
            "filling trade bucket gaps"
        );

        let last = loop {
            match self.store.max_timestamp().await {
                Ok(ts) => break ts,
                Err(e) => {
                    tracing::warn!(error = %e, "max timestamp query failed, retrying");
                    if self.pace(cancel).await {
                        report.cancelled = true;
                        return report;
                    }
                }
            }
        };

        let Some(last) = last else {
            tracing::info!("store is empty, skipping historical catch-up");
            return report;
        };

        let mut start = last.min(now - horizon) + Duration::minutes(1);

        while start <= now {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.history.fetch_window(start, PAGE_SIZE).await {
                Ok(buckets) => match self.insert_all(&buckets).await {
                    Ok(inserted) => {
                        report.pages += 1;
                        report.inserted += inserted;
                        tracing::info!(
                            start = %start,
                            count = buckets.len(),
                            "historical page archived"
                        );
                        start += Duration::minutes(i64::from(PAGE_SIZE));
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            start = %start,
                            "bucket insert failed, window will be retried"
                        );
                        telemetry::record_fetch_retry();
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        start = %start,
                        "historical fetch failed, window will be retried"
                    );
                    telemetry::record_fetch_retry();
                }
            }

            if self.pace(cancel).await {
                report.cancelled = true;
                break;
            }
            now = Utc::now();
        }

        tracing::info!(
            pages = report.pages,
            inserted = report.inserted,
            cancelled = report.cancelled,
            "gap fill complete"
        );
        report
    }

    async fn insert_all(&self, buckets: &[crate::bucket::TradeBucket]) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for bucket in buckets {
            self.store.insert(bucket).await?;
            telemetry::record_bucket(BucketSource::Historical);
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Rate-limit cushion between page requests. Returns true when
    /// cancelled mid-sleep.
    async fn pace(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.config.page_pace) => false,
        }
    }
}
