//! WebSocket transport
//!
//! A thin connection wrapper over tungstenite with ping/pong keepalive.
//! Reconnection is deliberately left to the caller: the stream consumer
//! must reconcile missed buckets between a disconnect and the next
//! connection attempt, so the retry loop lives there, paced by [`Backoff`].

mod client;
mod types;

pub use client::WsConn;
pub use types::{Backoff, WsConfig, WsError};
