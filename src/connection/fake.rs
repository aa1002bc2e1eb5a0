//! In-process fake socket connector for connection tests
//!
//! Every `connect` call hands the server-side ends of a fresh socket to the
//! test through [`FakeServer::accepted`]:
//!
//! ```text
//! manager send    -> SocketCommand -> FakeSocket::sent   (test reads)
//! test events_tx  -> SocketEvent   -> manager inbound    (manager reads)
//! ```
//!
//! A gated connector holds every `connect` call until the test releases a
//! permit, which keeps the connection in `Connecting` for as long as needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use url::Url;

use crate::connection::socket::{SocketCommand, SocketConnector, SocketEvent, SocketHandle};
use crate::error::{CockpitError, Result};

/// Server-side ends of one fake socket
#[derive(Debug)]
pub struct FakeSocket {
    /// URL the client connected to
    pub url: Url,
    /// Commands the client wrote
    pub sent: mpsc::UnboundedReceiver<SocketCommand>,
    /// Inject events the client will read
    pub events: mpsc::UnboundedSender<SocketEvent>,
}

impl FakeSocket {
    /// Inject one text message
    pub fn push_text(&self, text: &str) {
        let _ = self.events.send(SocketEvent::Text(text.to_string()));
    }

    /// Inject a server-side close
    pub fn close(&self) {
        let _ = self.events.send(SocketEvent::Closed);
    }
}

/// Test side of a [`FakeConnector`]
#[derive(Debug)]
pub struct FakeServer {
    pub accepted: mpsc::UnboundedReceiver<FakeSocket>,
}

impl FakeServer {
    /// Wait for the next accepted socket
    pub async fn next_socket(&mut self) -> FakeSocket {
        tokio::time::timeout(std::time::Duration::from_secs(2), self.accepted.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }
}

/// [`SocketConnector`] that connects to in-memory channels
#[derive(Debug)]
pub struct FakeConnector {
    accepted: mpsc::UnboundedSender<FakeSocket>,
    gate: Option<Arc<Semaphore>>,
    refuse: AtomicBool,
}

impl FakeConnector {
    /// A connector whose connections open immediately
    pub fn new() -> (Arc<Self>, FakeServer) {
        let (accepted, accepted_rx) = mpsc::unbounded_channel();
        let connector = Self {
            accepted,
            gate: None,
            refuse: AtomicBool::new(false),
        };
        (Arc::new(connector), FakeServer { accepted: accepted_rx })
    }

    /// A connector whose connections stay pending until a permit is added
    /// to the returned semaphore
    pub fn gated() -> (Arc<Self>, FakeServer, Arc<Semaphore>) {
        let (accepted, accepted_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let connector = Self {
            accepted,
            gate: Some(Arc::clone(&gate)),
            refuse: AtomicBool::new(false),
        };
        (
            Arc::new(connector),
            FakeServer { accepted: accepted_rx },
            gate,
        )
    }

    /// Make the next `connect` call fail
    pub fn refuse_next(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SocketConnector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<SocketHandle> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| CockpitError::Connection("gate closed".to_string()))?
                .forget();
        }
        if self.refuse.swap(false, Ordering::SeqCst) {
            return Err(CockpitError::Connection("connection refused".to_string()).into());
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let _ = self.accepted.send(FakeSocket {
            url: url.clone(),
            sent: outbound_rx,
            events: inbound_tx,
        });

        Ok(SocketHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
