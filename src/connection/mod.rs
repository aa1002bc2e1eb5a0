//! Streaming connection management
//!
//! This module owns the per-session WebSocket lifecycle:
//!
//! - [`socket`]: the [`SocketConnector`] seam and its tungstenite
//!   implementation
//! - [`manager::ConnectionManager`]: one live connection for the selected
//!   session, frame dispatch, output buffering and teardown
//! - [`auth::AuthTerminal`]: the interactive authentication stream
//!
//! Every connection attempt is stamped with a monotonically increasing
//! generation id. State mutations triggered by socket events carry the
//! generation they were captured with and are dropped when it no longer
//! matches the current one.

use serde::Serialize;

use crate::protocol::Frame;

pub mod auth;
pub mod manager;
pub mod socket;

#[cfg(test)]
pub mod fake;

pub use auth::{AuthState, AuthTerminal};
pub use manager::ConnectionManager;
pub use socket::{SocketCommand, SocketConnector, SocketEvent, SocketHandle, TungsteniteConnector};

/// Lifecycle status of one streaming connection
///
/// Allowed transitions: `Connecting -> Open`, `Connecting|Open -> Closed`,
/// `Connecting|Open -> Error -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Open,
    #[default]
    Closed,
    Error,
}

impl ConnectionStatus {
    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Closed)
                | (Open, Closed)
                | (Connecting, Error)
                | (Open, Error)
                | (Error, Closed)
        )
    }

    /// True while the connection has not reached a terminal state
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Open)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closed => "closed",
            ConnectionStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Transient per-session streaming state
///
/// `output_buffer` and `messages` are append-only; they are cleared only by
/// an explicit reset (selecting another session) or disposal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    /// Generation of the connection attempt this state belongs to
    pub generation: u64,
    /// Session being streamed, `None` when nothing is selected
    pub session_id: Option<String>,
    pub status: ConnectionStatus,
    /// Concatenated `content` of every `output` frame, in arrival order
    pub output_buffer: String,
    /// Every frame received, in arrival order
    pub messages: Vec<Frame>,
    /// Last user-visible connection error
    pub last_error: Option<String>,
    /// Generation whose reset started `output_buffer`; a reconnect of the
    /// same session keeps it
    pub origin: u64,
    /// Times output and messages were cleared while the socket stayed up
    pub clears: u64,
}

impl ConnectionState {
    /// Fresh state for a newly selected session
    pub fn for_session(generation: u64, session_id: Option<String>) -> Self {
        let status = if session_id.is_some() {
            ConnectionStatus::Connecting
        } else {
            ConnectionStatus::Closed
        };
        Self {
            generation,
            session_id,
            status,
            origin: generation,
            ..Self::default()
        }
    }

    /// Append a received frame, extending the output buffer for string
    /// `output` content
    pub fn apply_frame(&mut self, frame: Frame) {
        if let Some(text) = frame.output_text() {
            self.output_buffer.push_str(text);
        }
        self.messages.push(frame);
    }

    /// Drop output and messages, keeping the connection
    pub fn clear_output(&mut self) {
        self.output_buffer.clear();
        self.messages.clear();
        self.clears += 1;
    }

    /// Move to `next` if the state machine allows it
    ///
    /// Returns whether the status changed.
    pub fn transition(&mut self, next: ConnectionStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Whether the connection is currently open
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Open
    }
}

/// Change notification published by [`ConnectionManager`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A new generation started; prior output and messages are discarded
    /// unless `preserve_output` is set (reconnect of the same session)
    Reset {
        generation: u64,
        session_id: Option<String>,
        preserve_output: bool,
    },
    /// The connection status changed
    Status {
        generation: u64,
        status: ConnectionStatus,
        error: Option<String>,
    },
    /// A frame was received and appended
    Frame { generation: u64, frame: Frame },
    /// Output and messages were cleared without touching the socket
    Cleared { generation: u64 },
}

impl ConnectionEvent {
    /// Generation this event belongs to
    pub fn generation(&self) -> u64 {
        match self {
            ConnectionEvent::Reset { generation, .. }
            | ConnectionEvent::Status { generation, .. }
            | ConnectionEvent::Frame { generation, .. }
            | ConnectionEvent::Cleared { generation } => *generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse;

    #[test]
    fn test_allowed_transitions() {
        use ConnectionStatus::*;
        assert!(Connecting.can_transition_to(Open));
        assert!(Open.can_transition_to(Closed));
        assert!(Open.can_transition_to(Error));
        assert!(Error.can_transition_to(Closed));
    }

    #[test]
    fn test_forbidden_transitions() {
        use ConnectionStatus::*;
        assert!(!Closed.can_transition_to(Open));
        assert!(!Open.can_transition_to(Connecting));
        assert!(!Error.can_transition_to(Open));
        assert!(!Closed.can_transition_to(Error));
    }

    #[test]
    fn test_output_buffer_concatenates_output_frames() {
        let mut state = ConnectionState::for_session(1, Some("s1".to_string()));
        for raw in [
            r#"{"type":"output","session_id":"s1","data":{"content":"Build sta"}}"#,
            r#"{"type":"status","session_id":"s1","data":{"status":"running"}}"#,
            r#"{"type":"output","session_id":"s1","data":{"content":"rted\n"}}"#,
            r#"{"type":"output","session_id":"s1","data":{"content":7}}"#,
        ] {
            state.apply_frame(parse(raw).unwrap());
        }
        assert_eq!(state.output_buffer, "Build started\n");
        assert_eq!(state.messages.len(), 4);
    }

    #[test]
    fn test_state_for_no_session_is_closed() {
        let state = ConnectionState::for_session(3, None);
        assert_eq!(state.status, ConnectionStatus::Closed);
        assert!(!state.is_connected());
    }
}
