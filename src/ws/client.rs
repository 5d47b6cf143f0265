//! WebSocket connection with ping/pong keepalive

use super::types::{WsConfig, WsError};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// A single established WebSocket connection.
///
/// One value per connection attempt; the caller owns the reconnect loop.
/// `recv` replies to server pings and emits keepalive pings on the
/// configured interval, so the caller only ever sees text frames.
pub struct WsConn {
    write: WsSink,
    read: WsSource,
    ping: tokio::time::Interval,
}

impl WsConn {
    /// Open a connection to the configured URL.
    pub async fn connect(config: &WsConfig) -> Result<Self, WsError> {
        tracing::debug!(url = %config.url, "connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        let (write, read) = ws_stream.split();

        let mut ping = tokio::time::interval(config.ping_interval);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ping.reset();

        tracing::info!(url = %config.url, "WebSocket connected");
        Ok(Self { write, read, ping })
    }

    /// Send a text frame.
    pub async fn send(&mut self, text: String) -> Result<(), WsError> {
        self.write
            .send(Message::Text(text))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }

    /// Receive the next text frame.
    ///
    /// Returns `Closed` when the peer ends the stream and `ConnectionFailed`
    /// on a transport error; either way the connection is unusable and the
    /// caller should drop it.
    pub async fn recv(&mut self) -> Result<String, WsError> {
        loop {
            tokio::select! {
                msg = self.read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => return Ok(text),
                        Some(Ok(Message::Ping(data))) => {
                            self.write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("received close frame");
                            return Err(WsError::Closed);
                        }
                        Some(Ok(_)) => {
                            // binary frames are not part of this feed
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => return Err(WsError::Closed),
                    }
                }

                _ = self.ping.tick() => {
                    self.write.send(Message::Ping(Vec::new())).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                }
            }
        }
    }
}
