//! CLI interface for bitmex-buckets
//!
//! Provides subcommands for:
//! - `run`: Start the capture service (catch-up, then live streaming)
//! - `backfill`: One-shot gap reconciliation
//! - `config`: Show resolved configuration

mod backfill;
mod run;

pub use backfill::BackfillArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bitmex-buckets")]
#[command(about = "Gap-free one-minute trade bucket capture for BitMEX")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Production instance; resolves config/buckets_<N>.toml and takes
    /// precedence over --config
    #[arg(short, long)]
    pub instance: Option<u8>,
}

impl Cli {
    /// Configuration path after applying the instance selector.
    pub fn config_path(&self) -> String {
        match self.instance {
            Some(n) => format!("config/buckets_{n}.toml"),
            None => self.config.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the capture service
    Run(RunArgs),
    /// Run one gap reconciliation pass and exit
    Backfill(BackfillArgs),
    /// Show resolved configuration
    Config,
}
