//! Interactive account authentication stream
//!
//! The backend runs a login process for an account and relays its terminal
//! over `/ws/accounts/{id}/auth-stream`. The client only shows the output
//! and forwards what the user types; the login protocol itself belongs to
//! the backend.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::connection::socket::{SocketCommand, SocketConnector, SocketEvent};
use crate::protocol::{AuthFrame, ClientFrame};

const DEFAULT_AUTH_ERROR: &str = "Authentication error";
const SOCKET_ERROR: &str = "WebSocket connection error";

/// Observable state of one authentication flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Socket is open
    pub connected: bool,
    /// Concatenated login process output, may contain ANSI escapes
    pub output: String,
    /// The backend reported `authenticated`
    pub done: bool,
    /// Last error shown to the user
    pub error: Option<String>,
}

/// Client side of the authentication stream
#[derive(Debug)]
pub struct AuthTerminal {
    account_id: String,
    state: watch::Receiver<AuthState>,
    commands: mpsc::UnboundedSender<SocketCommand>,
    task: JoinHandle<()>,
}

impl AuthTerminal {
    /// Start connecting to the auth stream at `url`
    ///
    /// Returns immediately; connection progress and failures are reported
    /// through [`AuthTerminal::subscribe`].
    pub fn open(connector: Arc<dyn SocketConnector>, account_id: &str, url: Url) -> Self {
        let (state_tx, state) = watch::channel(AuthState::default());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_auth_stream(
            connector,
            account_id.to_string(),
            url,
            state_tx,
            command_rx,
        ));

        Self {
            account_id: account_id.to_string(),
            state,
            commands,
            task,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Current state
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.clone()
    }

    /// Relay one line of user input to the login process
    ///
    /// Blank input is ignored, as is input while the socket is not open or
    /// after authentication completed. The text is sent as typed.
    pub fn send_input(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        {
            let state = self.state.borrow();
            if !state.connected || state.done {
                tracing::debug!(account_id = %self.account_id, "Dropping auth input");
                return false;
            }
        }
        let frame = ClientFrame::Input {
            content: text.to_string(),
        };
        self.commands
            .send(SocketCommand::Text(frame.to_json()))
            .is_ok()
    }

    /// Wait until authentication completes or the stream ends
    ///
    /// Returns the final state.
    pub async fn wait(&mut self) -> AuthState {
        let mut state = self.state.clone();
        loop {
            {
                let current = state.borrow_and_update();
                if current.done {
                    return current.clone();
                }
            }
            if state.changed().await.is_err() {
                return state.borrow().clone();
            }
        }
    }

    /// Close the stream
    pub fn close(&self) {
        let _ = self.commands.send(SocketCommand::Close);
    }
}

impl Drop for AuthTerminal {
    fn drop(&mut self) {
        // Aborting drops the socket handle, which closes the socket.
        self.task.abort();
    }
}

async fn run_auth_stream(
    connector: Arc<dyn SocketConnector>,
    account_id: String,
    url: Url,
    state: watch::Sender<AuthState>,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
) {
    tracing::info!(account_id = %account_id, url = %url, "Opening auth stream");
    let mut handle = match connector.connect(&url).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(account_id = %account_id, error = %e, "Auth stream failed to open");
            state.send_modify(|s| {
                s.error = Some(SOCKET_ERROR.to_string());
                s.connected = false;
            });
            return;
        }
    };

    state.send_modify(|s| {
        s.connected = true;
        s.error = None;
    });

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SocketCommand::Text(text)) => {
                    let _ = handle.outbound.send(SocketCommand::Text(text));
                }
                Some(SocketCommand::Close) | None => {
                    let _ = handle.outbound.send(SocketCommand::Close);
                    break;
                }
            },
            event = handle.inbound.recv() => match event {
                Some(SocketEvent::Text(raw)) => match AuthFrame::parse(&raw) {
                    Ok(frame) => apply_frame(&state, &account_id, frame),
                    Err(e) => {
                        tracing::warn!(account_id = %account_id, error = %e, "Dropping malformed auth frame");
                    }
                },
                Some(SocketEvent::Error(message)) => {
                    tracing::warn!(account_id = %account_id, error = %message, "Auth stream error");
                    state.send_modify(|s| {
                        s.error = Some(SOCKET_ERROR.to_string());
                        s.connected = false;
                    });
                }
                Some(SocketEvent::Closed) | None => break,
            },
        }
    }

    tracing::info!(account_id = %account_id, "Auth stream closed");
    state.send_modify(|s| s.connected = false);
}

fn apply_frame(state: &watch::Sender<AuthState>, account_id: &str, frame: AuthFrame) {
    match frame {
        AuthFrame::Output { content } => {
            if let Some(content) = content {
                state.send_modify(|s| s.output.push_str(&content));
            }
        }
        AuthFrame::Status { status } if status.as_deref() == Some("authenticated") => {
            tracing::info!(account_id, "Account authenticated");
            state.send_modify(|s| s.done = true);
        }
        AuthFrame::Status { status } => {
            tracing::debug!(account_id, status = ?status, "Auth status");
        }
        AuthFrame::Error { message } => {
            state.send_modify(|s| {
                s.error = Some(message.unwrap_or_else(|| DEFAULT_AUTH_ERROR.to_string()))
            });
        }
        AuthFrame::Other => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::FakeConnector;
    use std::time::Duration;

    fn url() -> Url {
        Url::parse("ws://cockpit.test/ws/accounts/a1/auth-stream").unwrap()
    }

    async fn wait_for<F>(terminal: &AuthTerminal, predicate: F) -> AuthState
    where
        F: Fn(&AuthState) -> bool,
    {
        let mut rx = terminal.subscribe();
        let result = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if predicate(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await;
        result.expect("auth state condition not reached")
    }

    #[tokio::test]
    async fn test_output_accumulates_and_input_is_relayed() {
        let (connector, mut server) = FakeConnector::new();
        let terminal = AuthTerminal::open(connector, "a1", url());
        let mut socket = server.next_socket().await;
        wait_for(&terminal, |s| s.connected).await;

        socket.push_text(r#"{"type":"output","content":"Paste code: ","account_id":"a1"}"#);
        socket.push_text(r#"{"type":"output","account_id":"a1"}"#);
        let state = wait_for(&terminal, |s| !s.output.is_empty()).await;
        assert_eq!(state.output, "Paste code: ");

        assert!(terminal.send_input(" abc123 "));
        let sent = tokio::time::timeout(Duration::from_secs(2), socket.sent.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            sent,
            SocketCommand::Text(r#"{"type":"input","content":" abc123 "}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (connector, mut server) = FakeConnector::new();
        let terminal = AuthTerminal::open(connector, "a1", url());
        let mut socket = server.next_socket().await;
        wait_for(&terminal, |s| s.connected).await;

        assert!(!terminal.send_input("   "));
        assert!(socket.sent.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_authenticated_status_completes_flow() {
        let (connector, mut server) = FakeConnector::new();
        let mut terminal = AuthTerminal::open(connector, "a1", url());
        let socket = server.next_socket().await;

        socket.push_text(r#"{"type":"status","status":"authenticated","account_id":"a1"}"#);
        let state = tokio::time::timeout(Duration::from_secs(2), terminal.wait())
            .await
            .unwrap();
        assert!(state.done);
        assert!(!terminal.send_input("late"));
    }

    #[tokio::test]
    async fn test_error_frame_defaults_message() {
        let (connector, mut server) = FakeConnector::new();
        let terminal = AuthTerminal::open(connector, "a1", url());
        let socket = server.next_socket().await;

        socket.push_text(r#"{"type":"error"}"#);
        let state = wait_for(&terminal, |s| s.error.is_some()).await;
        assert_eq!(state.error.as_deref(), Some("Authentication error"));
    }

    #[tokio::test]
    async fn test_connect_failure_reports_socket_error() {
        let (connector, _server) = FakeConnector::new();
        connector.refuse_next();
        let terminal = AuthTerminal::open(connector, "a1", url());

        let state = wait_for(&terminal, |s| s.error.is_some()).await;
        assert_eq!(state.error.as_deref(), Some("WebSocket connection error"));
        assert!(!state.connected);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let (connector, mut server) = FakeConnector::new();
        let terminal = AuthTerminal::open(connector, "a1", url());
        let socket = server.next_socket().await;

        socket.push_text("not json");
        socket.push_text(r#"{"type":"output","content":"ok"}"#);
        let state = wait_for(&terminal, |s| !s.output.is_empty()).await;
        assert_eq!(state.output, "ok");
        assert!(state.error.is_none());
    }
}
