//! Authentication stream frames
//!
//! The auth stream does not use the session envelope; its frames are flat:
//! `{"type":"output","content":...}`, `{"type":"status","status":"authenticated"}`
//! and `{"type":"error","message":...}`.

use serde::Deserialize;

use crate::error::{CockpitError, Result};

/// Inbound frame of the interactive authentication stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthFrame {
    /// Terminal output from the login process
    Output {
        #[serde(default)]
        content: Option<String>,
    },
    /// Progress of the login process
    Status {
        #[serde(default)]
        status: Option<String>,
    },
    /// Login failure reported by the backend
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any other frame type
    #[serde(other)]
    Other,
}

impl AuthFrame {
    /// Parse one raw auth stream message
    ///
    /// # Errors
    ///
    /// Returns [`CockpitError::MalformedFrame`] if the text is not a JSON
    /// object with a string `type`.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CockpitError::MalformedFrame(format!("auth frame: {}", e)).into())
    }

    /// True when this frame signals that authentication completed
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthFrame::Status { status: Some(s) } if s == "authenticated")
    }
}
