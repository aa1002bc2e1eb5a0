//! Stream frame protocol
//!
//! Typed message envelopes for the session and authentication WebSocket
//! streams. Everything here is pure data and parsing; no I/O happens in
//! this module.
//!
//! - [`frame`]: inbound session frames (`output`, `status`, `error`,
//!   `account_switch`, `task_complete`)
//! - [`auth`]: inbound frames of the interactive authentication stream
//! - [`ClientFrame`]: outbound frames written by the client

use serde::{Deserialize, Serialize};

pub mod auth;
pub mod frame;

pub use auth::AuthFrame;
pub use frame::{parse, Frame, FrameKind, FramePayload};

/// Outbound frame written by the client on either stream
///
/// Serializes to `{"type":"message"|"input","content":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A chat message forwarded to the session process
    Message {
        /// Message text
        content: String,
    },
    /// Raw stdin relayed to the authentication process
    Input {
        /// Input text
        content: String,
    },
}

impl ClientFrame {
    /// Serialize the frame to its wire representation
    pub fn to_json(&self) -> String {
        // A struct of plain strings cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}
