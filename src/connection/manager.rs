//! Session connection manager
//!
//! [`ConnectionManager`] keeps at most one live socket: the one for the
//! currently selected session. Selecting another session closes the prior
//! socket before the new one is opened, and any event still in flight from
//! the old socket is discarded by the generation check in
//! [`Shared::update`].
//!
//! There is no automatic reconnect and no send buffering. A dropped
//! connection stays `Closed` until the session is selected again, and
//! [`ConnectionManager::send`] silently drops messages unless the socket is
//! `Open`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use url::Url;

use crate::connection::socket::{SocketCommand, SocketConnector, SocketEvent};
use crate::connection::{ConnectionEvent, ConnectionState, ConnectionStatus};
use crate::endpoints::Endpoints;
use crate::protocol::{parse, ClientFrame};

const EVENT_CAPACITY: usize = 1024;

/// State shared between the manager and its connection tasks
#[derive(Debug)]
struct Shared {
    next_generation: AtomicU64,
    state: RwLock<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Shared {
    /// Mutate the state on behalf of `generation`
    ///
    /// The closure runs only while `generation` is still current; the event
    /// it returns is published under the same lock so subscribers observe
    /// events in state order. Returns false for a stale generation.
    async fn update<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut ConnectionState) -> Option<ConnectionEvent>,
    {
        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::trace!(
                generation,
                current = state.generation,
                "Ignoring event from stale connection"
            );
            return false;
        }
        if let Some(event) = f(&mut state) {
            let _ = self.events.send(event);
        }
        true
    }

    fn status_event(generation: u64, state: &ConnectionState) -> ConnectionEvent {
        ConnectionEvent::Status {
            generation,
            status: state.status,
            error: state.last_error.clone(),
        }
    }

    async fn fail(&self, generation: u64, message: String) {
        self.update(generation, |state| {
            state.transition(ConnectionStatus::Error).then(|| {
                state.last_error = Some(message);
                Self::status_event(generation, state)
            })
        })
        .await;
    }

    async fn mark_closed(&self, generation: u64) {
        self.update(generation, |state| {
            state
                .transition(ConnectionStatus::Closed)
                .then(|| Self::status_event(generation, state))
        })
        .await;
    }
}

/// Handle on the connection task of the current generation
#[derive(Debug)]
struct ActiveConnection {
    generation: u64,
    session_id: String,
    commands: mpsc::UnboundedSender<SocketCommand>,
}

/// Owns the streaming connection of the selected session
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use cockpit::connection::{ConnectionManager, TungsteniteConnector};
/// use cockpit::endpoints::Endpoints;
///
/// # async fn example() -> anyhow::Result<()> {
/// let endpoints = Endpoints::new("http://localhost:8000")?;
/// let manager = ConnectionManager::new(Arc::new(TungsteniteConnector::new()), endpoints);
/// manager.select_session(Some("session-1")).await;
/// let sent = manager.send("git status").await;
/// # let _ = sent;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConnectionManager {
    connector: Arc<dyn SocketConnector>,
    endpoints: Endpoints,
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveConnection>>,
}

impl ConnectionManager {
    /// Create a manager with nothing selected
    pub fn new(connector: Arc<dyn SocketConnector>, endpoints: Endpoints) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connector,
            endpoints,
            shared: Arc::new(Shared {
                next_generation: AtomicU64::new(0),
                state: RwLock::new(ConnectionState::default()),
                events,
            }),
            active: Mutex::new(None),
        }
    }

    /// Subscribe to state changes
    ///
    /// Events carry their generation; consumers that mirror state should
    /// drop events whose generation is older than the last `Reset`.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Copy of the current state together with a receiver for every later
    /// event
    ///
    /// Events are published under the state lock, so holding it across both
    /// steps means no event is both part of the copy and delivered to the
    /// receiver.
    pub async fn subscribe_with_snapshot(
        &self,
    ) -> (ConnectionState, broadcast::Receiver<ConnectionEvent>) {
        let state = self.shared.state.read().await;
        (state.clone(), self.shared.events.subscribe())
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> ConnectionState {
        self.shared.state.read().await.clone()
    }

    /// Current connection status
    pub async fn status(&self) -> ConnectionStatus {
        self.shared.state.read().await.status
    }

    /// Current output buffer
    pub async fn output_buffer(&self) -> String {
        self.shared.state.read().await.output_buffer.clone()
    }

    /// Select the session to stream, or `None` to disconnect
    ///
    /// Selecting a different session closes the prior socket first and
    /// resets output and messages. Re-selecting the current session is a
    /// no-op while its socket is connecting or open; after the socket
    /// dropped it reconnects and keeps the accumulated output.
    pub async fn select_session(&self, session_id: Option<&str>) {
        let mut active = self.active.lock().await;

        if let (Some(current), Some(requested)) = (active.as_ref(), session_id) {
            if current.session_id == requested {
                if self.shared.state.read().await.status.is_live() {
                    return;
                }
                if let Some(previous) = active.take() {
                    self.close_active(previous).await;
                }
                self.open(&mut active, requested, true).await;
                return;
            }
        }

        if let Some(previous) = active.take() {
            self.close_active(previous).await;
        }

        match session_id {
            Some(id) => self.open(&mut active, id, false).await,
            None => {
                let generation = self.next_generation();
                let mut state = self.shared.state.write().await;
                *state = ConnectionState::for_session(generation, None);
                let _ = self.shared.events.send(ConnectionEvent::Reset {
                    generation,
                    session_id: None,
                    preserve_output: false,
                });
            }
        }
    }

    /// Re-open the current session's socket after it dropped
    ///
    /// Returns false when nothing is selected or the socket is still live.
    pub async fn reconnect(&self) -> bool {
        let session_id = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(current) => current.session_id.clone(),
                None => return false,
            }
        };
        if self.status().await.is_live() {
            return false;
        }
        self.select_session(Some(&session_id)).await;
        true
    }

    /// Close the current socket and clear all session state
    pub async fn close(&self) {
        self.select_session(None).await;
    }

    /// Send a chat message to the current session
    ///
    /// The message is written only if the socket is `Open`; otherwise it is
    /// dropped without error. Returns whether the message was handed to
    /// the socket.
    pub async fn send(&self, content: &str) -> bool {
        let active = self.active.lock().await;
        let Some(current) = active.as_ref() else {
            tracing::debug!("Dropping message: no session selected");
            return false;
        };

        {
            let state = self.shared.state.read().await;
            if state.generation != current.generation || state.status != ConnectionStatus::Open
            {
                tracing::debug!(
                    session_id = %current.session_id,
                    status = %state.status,
                    "Dropping message: socket not open"
                );
                return false;
            }
        }

        let frame = ClientFrame::Message {
            content: content.to_string(),
        };
        current
            .commands
            .send(SocketCommand::Text(frame.to_json()))
            .is_ok()
    }

    /// Clear output and messages of the current session without touching
    /// the socket
    pub async fn clear_output(&self) {
        let generation = self.shared.state.read().await.generation;
        self.shared
            .update(generation, |state| {
                state.clear_output();
                Some(ConnectionEvent::Cleared { generation })
            })
            .await;
    }

    fn next_generation(&self) -> u64 {
        self.shared.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn close_active(&self, previous: ActiveConnection) {
        tracing::info!(
            session_id = %previous.session_id,
            generation = previous.generation,
            "Closing session socket"
        );
        let _ = previous.commands.send(SocketCommand::Close);
        self.shared.mark_closed(previous.generation).await;
    }

    async fn open(&self, active: &mut Option<ActiveConnection>, session_id: &str, preserve: bool) {
        let generation = self.next_generation();
        {
            let mut state = self.shared.state.write().await;
            if preserve {
                state.generation = generation;
                state.status = ConnectionStatus::Connecting;
                state.last_error = None;
            } else {
                *state = ConnectionState::for_session(generation, Some(session_id.to_string()));
            }
            let _ = self.shared.events.send(ConnectionEvent::Reset {
                generation,
                session_id: Some(session_id.to_string()),
                preserve_output: preserve,
            });
            let _ = self
                .shared
                .events
                .send(Shared::status_event(generation, &state));
        }

        let (commands, command_rx) = mpsc::unbounded_channel();
        *active = Some(ActiveConnection {
            generation,
            session_id: session_id.to_string(),
            commands,
        });

        let url = self.endpoints.session_socket(session_id);
        tracing::info!(session_id, generation, url = %url, "Opening session socket");

        tokio::spawn(run_connection(
            Arc::clone(&self.connector),
            Arc::clone(&self.shared),
            generation,
            url,
            command_rx,
        ));
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.try_lock() {
            if let Some(current) = active.take() {
                let _ = current.commands.send(SocketCommand::Close);
            }
        }
    }
}

/// Drive one connection attempt until it closes or goes stale
async fn run_connection(
    connector: Arc<dyn SocketConnector>,
    shared: Arc<Shared>,
    generation: u64,
    url: Url,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
) {
    let mut handle = match connector.connect(&url).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(generation, url = %url, error = %e, "Session socket failed to open");
            shared.fail(generation, e.to_string()).await;
            shared.mark_closed(generation).await;
            return;
        }
    };

    let opened = shared
        .update(generation, |state| {
            state
                .transition(ConnectionStatus::Open)
                .then(|| Shared::status_event(generation, state))
        })
        .await;
    if !opened {
        let _ = handle.outbound.send(SocketCommand::Close);
        return;
    }
    tracing::info!(generation, url = %url, "Session socket open");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SocketCommand::Text(text)) => {
                    if handle.outbound.send(SocketCommand::Text(text)).is_err() {
                        shared.mark_closed(generation).await;
                        return;
                    }
                }
                Some(SocketCommand::Close) | None => {
                    let _ = handle.outbound.send(SocketCommand::Close);
                    return;
                }
            },
            event = handle.inbound.recv() => match event {
                Some(SocketEvent::Text(raw)) => {
                    let frame = match parse(&raw) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(generation, error = %e, "Dropping malformed frame");
                            continue;
                        }
                    };
                    let current = shared
                        .update(generation, |state| {
                            state.apply_frame(frame.clone());
                            Some(ConnectionEvent::Frame { generation, frame })
                        })
                        .await;
                    if !current {
                        let _ = handle.outbound.send(SocketCommand::Close);
                        return;
                    }
                }
                Some(SocketEvent::Error(message)) => {
                    tracing::warn!(generation, error = %message, "Session socket error");
                    shared.fail(generation, message).await;
                }
                Some(SocketEvent::Closed) | None => {
                    tracing::info!(generation, "Session socket closed");
                    shared.mark_closed(generation).await;
                    return;
                }
            },
        }
    }
}
