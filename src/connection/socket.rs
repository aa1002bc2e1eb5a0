//! WebSocket connector abstraction
//!
//! A [`SocketConnector`] opens one socket and hands back a [`SocketHandle`]:
//! a command channel into the socket and an event channel out of it. The
//! handle hides the transport so the connection manager can be driven by an
//! in-process fake in tests.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::{CockpitError, Result};

/// Command written into an open socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketCommand {
    /// Send one text message
    Text(String),
    /// Close the socket
    Close,
}

/// Event read from an open socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One inbound text message
    Text(String),
    /// Transport error; a `Closed` event always follows
    Error(String),
    /// The socket closed (by either side)
    Closed,
}

/// Channels of one open socket
#[derive(Debug)]
pub struct SocketHandle {
    /// Commands into the socket; dropping the sender closes the socket
    pub outbound: mpsc::UnboundedSender<SocketCommand>,
    /// Events out of the socket, in arrival order
    pub inbound: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Opens streaming sockets
#[async_trait::async_trait]
pub trait SocketConnector: Send + Sync + std::fmt::Debug {
    /// Open a socket to `url`
    ///
    /// # Errors
    ///
    /// Returns [`CockpitError::Connection`] if the handshake fails.
    async fn connect(&self, url: &Url) -> Result<SocketHandle>;
}

/// [`SocketConnector`] backed by `tokio-tungstenite`
///
/// There is no reconnect or backoff: when the socket drops, the handle
/// reports `Closed` and recovery is left to the caller.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<SocketHandle> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| CockpitError::Connection(format!("connect to {} failed: {}", url, e)))?;

        let (mut sink, mut stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<SocketCommand>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SocketEvent>();
        let target = url.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = outbound_rx.recv() => match command {
                        Some(SocketCommand::Text(text)) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                tracing::warn!(url = %target, error = %e, "WebSocket send failed");
                                let _ = inbound_tx.send(SocketEvent::Error(e.to_string()));
                                break;
                            }
                        }
                        Some(SocketCommand::Close) | None => {
                            let _ = sink.close().await;
                            break;
                        }
                    },
                    message = stream.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if inbound_tx.send(SocketEvent::Text(text)).is_err() {
                                let _ = sink.close().await;
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        // Binary, ping and pong frames carry no session data.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(url = %target, error = %e, "WebSocket read failed");
                            let _ = inbound_tx.send(SocketEvent::Error(e.to_string()));
                            break;
                        }
                    },
                }
            }
            tracing::debug!(url = %target, "WebSocket pump finished");
            let _ = inbound_tx.send(SocketEvent::Closed);
        });

        Ok(SocketHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
