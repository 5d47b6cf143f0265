use bitmex_buckets::cli::{Cli, Commands};
use bitmex_buckets::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration. An unreadable config is fatal: there is no useful
    // default for store credentials.
    let path = cli.config_path();
    let config = Config::load(&path)
        .map_err(|e| anyhow::anyhow!("Could not load config from {}: {}", path, e))?;

    // Initialize telemetry
    bitmex_buckets::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(symbol = %config.instrument.symbol, "starting trade bucket capture");
            args.execute(config).await?;
        }
        Commands::Backfill(args) => {
            tracing::info!(symbol = %config.instrument.symbol, "starting one-shot backfill");
            args.execute(config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Instrument: {}", config.instrument.symbol);
            println!(
                "  API: {} ({})",
                config.api.rest_base(),
                if config.api.test { "testnet" } else { "live" }
            );
            println!("  Feed: {}", config.api.ws_base());
            println!(
                "  Store: max {} connections",
                config.store.max_connections
            );
            println!(
                "  Reconcile: {} day horizon, {}s page pace",
                config.reconcile.startup_horizon_days, config.reconcile.page_pace_secs
            );
        }
    }

    Ok(())
}
