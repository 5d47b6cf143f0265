//! Backfill command implementation

use clap::Args;

use crate::config::Config;
use crate::history::{BitmexHistory, HistoryConfig};
use crate::reconcile::GapReconciler;
use crate::store::PgStore;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Look-back horizon in days (defaults to the configured startup horizon)
    #[arg(short, long)]
    pub days: Option<i64>,
}

impl BackfillArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let store = PgStore::connect(&config.store).await?;

        let history = BitmexHistory::new(HistoryConfig {
            base_url: config.api.rest_base(),
            symbol: config.instrument.symbol.clone(),
            ..Default::default()
        });

        let reconcile = config.reconcile.to_config();
        let horizon = self
            .days
            .map(chrono::Duration::days)
            .unwrap_or(reconcile.startup_horizon);

        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
        }

        let reconciler = GapReconciler::new(store.clone(), history, reconcile);
        let report = reconciler.fill_gaps(horizon, &cancel).await;

        tracing::info!(
            pages = report.pages,
            inserted = report.inserted,
            cancelled = report.cancelled,
            "backfill finished"
        );

        store.close().await;
        Ok(())
    }
}
