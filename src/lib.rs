//! bitmex-buckets: gap-free one-minute trade bucket capture for BitMEX
//!
//! This library provides the core components for:
//! - Historical catch-up over the REST trade/bucketed API
//! - Live bucket capture from the realtime websocket feed
//! - Gap reconciliation across restarts, API failures, and feed outages
//! - Idempotent persistence into PostgreSQL
//! - CLI, configuration, and observability

pub mod bucket;
pub mod cli;
pub mod config;
pub mod history;
pub mod outage;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod stream;
pub mod telemetry;
pub mod ws;
