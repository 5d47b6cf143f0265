//! Run command implementation

use clap::Args;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::history::{BitmexHistory, HistoryConfig};
use crate::service::CaptureService;
use crate::store::PgStore;
use crate::stream::StreamConfig;
use crate::ws::WsConfig;

/// Bounded wait for in-flight work to observe cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let symbol = config.instrument.symbol.clone();

        // A store that cannot be reached at startup is fatal; everything
        // after this point retries instead of exiting.
        let store = PgStore::connect(&config.store).await?;

        let history = BitmexHistory::new(HistoryConfig {
            base_url: config.api.rest_base(),
            symbol: symbol.clone(),
            ..Default::default()
        });

        let ws = WsConfig::new(config.api.ws_base())
            .initial_delay(Duration::from_secs(
                config.stream.initial_reconnect_delay_secs,
            ))
            .max_delay(Duration::from_secs(config.stream.max_reconnect_delay_secs))
            .ping_interval(Duration::from_secs(config.stream.ping_interval_secs));
        let stream = StreamConfig { ws, symbol };

        let service = CaptureService::new(
            store.clone(),
            history,
            config.reconcile.to_config(),
            stream,
        );

        let cancel = CancellationToken::new();
        let mut task = tokio::spawn(service.run(cancel.clone()));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                cancel.cancel();
                if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                    tracing::warn!("capture task did not stop within grace period, abandoning");
                }
            }
            joined = &mut task => {
                // The service only returns when cancelled, so reaching this
                // arm means the task died.
                joined?;
            }
        }

        store.close().await;
        tracing::info!("store connection closed");
        Ok(())
    }
}
