//! Capture orchestration
//!
//! Sequences the startup catch-up pass and the live stream. The two never
//! write concurrently: reconciliation runs to completion before streaming
//! begins, and the stream consumer itself suspends while a post-outage
//! reconciliation runs.

use tokio_util::sync::CancellationToken;

use crate::history::BucketHistory;
use crate::reconcile::{GapReconciler, ReconcileConfig};
use crate::store::BucketStore;
use crate::stream::{LiveStream, StreamConfig};

/// Long-running capture service: catch up, then stream until cancelled.
pub struct CaptureService<S, H> {
    store: S,
    history: H,
    reconcile: ReconcileConfig,
    stream: StreamConfig,
}

impl<S, H> CaptureService<S, H>
where
    S: BucketStore + Clone,
    H: BucketHistory,
{
    pub fn new(store: S, history: H, reconcile: ReconcileConfig, stream: StreamConfig) -> Self {
        Self {
            store,
            history,
            reconcile,
            stream,
        }
    }

    /// Run until the token is cancelled.
    ///
    /// Startup always reconciles first, bounded by the configured horizon,
    /// so downtime since the previous run is recovered before any live
    /// frame is processed.
    pub async fn run(self, cancel: CancellationToken) {
        let startup_horizon = self.reconcile.startup_horizon;
        let reconciler = GapReconciler::new(self.store.clone(), self.history, self.reconcile);

        let report = reconciler.fill_gaps(startup_horizon, &cancel).await;
        tracing::info!(
            pages = report.pages,
            inserted = report.inserted,
            "startup reconciliation finished"
        );

        if cancel.is_cancelled() {
            return;
        }

        let mut stream = LiveStream::new(self.stream, self.store, reconciler);
        stream.run(&cancel).await;
        tracing::info!("capture service stopped");
    }
}
