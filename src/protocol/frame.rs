//! Session stream frames
//!
//! The backend emits JSON envelopes of the form
//! `{"type": ..., "session_id": ..., "timestamp": ..., "data": {...}}`.
//! [`parse`] turns one such text message into a [`Frame`] whose payload is
//! a tagged union selected by the `type` discriminant. Frames are immutable
//! once parsed.
//!
//! Unknown `type` values are accepted as [`FramePayload::Unknown`] so that a
//! newer backend does not break an older client. There is no protocol
//! version field on the wire.

use serde_json::{Map, Value};

use crate::error::{CockpitError, Result};

/// Discriminant of a session frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Output,
    Status,
    Error,
    AccountSwitch,
    TaskComplete,
    /// Any other `type` string, preserved verbatim
    Unknown(String),
}

impl FrameKind {
    /// Map a wire `type` string onto a kind
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "output" => FrameKind::Output,
            "status" => FrameKind::Status,
            "error" => FrameKind::Error,
            "account_switch" => FrameKind::AccountSwitch,
            "task_complete" => FrameKind::TaskComplete,
            other => FrameKind::Unknown(other.to_string()),
        }
    }

    /// The wire `type` string of this kind
    pub fn as_str(&self) -> &str {
        match self {
            FrameKind::Output => "output",
            FrameKind::Status => "status",
            FrameKind::Error => "error",
            FrameKind::AccountSwitch => "account_switch",
            FrameKind::TaskComplete => "task_complete",
            FrameKind::Unknown(kind) => kind,
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strongly-typed frame payload, one variant per frame `type`
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    /// Streaming process output; `content` is `None` when the backend sent
    /// a non-string value
    Output { content: Option<String> },

    /// Session status change (e.g. `{"status": "stopped"}`)
    Status {
        status: Option<String>,
        content: Option<String>,
    },

    /// Backend-reported error
    Error { message: Option<String> },

    /// The backend rotated the session onto another account
    AccountSwitch {
        old_account: Option<String>,
        new_account: Option<String>,
        reason: Option<String>,
    },

    /// The session finished a task
    TaskComplete { summary: Option<String> },

    /// Frame of an unrecognised type, kept for generic rendering
    Unknown {
        kind: String,
        data: Map<String, Value>,
    },
}

/// One discrete message received over a session stream
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Session the frame belongs to (empty when the backend omitted it)
    pub session_id: String,
    /// Raw timestamp string as sent by the backend
    pub timestamp: Option<String>,
    /// Typed payload
    pub payload: FramePayload,
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parse one raw text message into a [`Frame`]
///
/// # Errors
///
/// Returns [`CockpitError::MalformedFrame`] if the text is not a JSON
/// object, or if `type` is missing or not a string. A missing or
/// non-object `data` is treated as empty.
///
/// # Examples
///
/// ```
/// use cockpit::protocol::{parse, FramePayload};
///
/// let frame = parse(r#"{"type":"output","session_id":"s1","data":{"content":"hi"}}"#).unwrap();
/// assert_eq!(frame.payload, FramePayload::Output { content: Some("hi".into()) });
/// ```
pub fn parse(raw: &str) -> Result<Frame> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CockpitError::MalformedFrame(format!("invalid JSON: {}", e)))?;

    let Value::Object(mut envelope) = value else {
        return Err(CockpitError::MalformedFrame("frame is not a JSON object".to_string()).into());
    };

    let kind = match envelope.get("type") {
        Some(Value::String(kind)) => FrameKind::from_wire(kind),
        Some(_) => {
            return Err(
                CockpitError::MalformedFrame("frame type is not a string".to_string()).into(),
            )
        }
        None => {
            return Err(CockpitError::MalformedFrame("frame has no type".to_string()).into())
        }
    };

    let session_id = string_field(&envelope, "session_id").unwrap_or_default();
    let timestamp = string_field(&envelope, "timestamp");
    let data = match envelope.remove("data") {
        Some(Value::Object(data)) => data,
        _ => Map::new(),
    };

    let payload = match kind {
        FrameKind::Output => FramePayload::Output {
            content: string_field(&data, "content"),
        },
        FrameKind::Status => FramePayload::Status {
            status: string_field(&data, "status"),
            content: string_field(&data, "content"),
        },
        FrameKind::Error => FramePayload::Error {
            message: string_field(&data, "content")
                .or_else(|| string_field(&data, "message"))
                .or_else(|| string_field(&data, "error")),
        },
        FrameKind::AccountSwitch => FramePayload::AccountSwitch {
            old_account: string_field(&data, "old_account"),
            new_account: string_field(&data, "new_account"),
            reason: string_field(&data, "reason"),
        },
        FrameKind::TaskComplete => FramePayload::TaskComplete {
            summary: string_field(&data, "summary"),
        },
        FrameKind::Unknown(kind) => FramePayload::Unknown { kind, data },
    };

    Ok(Frame {
        session_id,
        timestamp,
        payload,
    })
}

impl Frame {
    /// The discriminant of this frame
    pub fn kind(&self) -> FrameKind {
        match &self.payload {
            FramePayload::Output { .. } => FrameKind::Output,
            FramePayload::Status { .. } => FrameKind::Status,
            FramePayload::Error { .. } => FrameKind::Error,
            FramePayload::AccountSwitch { .. } => FrameKind::AccountSwitch,
            FramePayload::TaskComplete { .. } => FrameKind::TaskComplete,
            FramePayload::Unknown { kind, .. } => FrameKind::Unknown(kind.clone()),
        }
    }

    /// Output text carried by an `output` frame, if it is a string
    pub fn output_text(&self) -> Option<&str> {
        match &self.payload {
            FramePayload::Output { content } => content.as_deref(),
            _ => None,
        }
    }

    /// Text the presentation layer shows for this frame
    ///
    /// Unknown frame types render as generic text: their `data.content`
    /// string when present, else the raw `data` object.
    pub fn display_text(&self) -> String {
        match &self.payload {
            FramePayload::Output { content } => content.clone().unwrap_or_default(),
            FramePayload::Status { status, content } => match (content, status) {
                (Some(content), _) => content.clone(),
                (None, Some(status)) => format!("Session status: {}", status),
                (None, None) => "Session status changed".to_string(),
            },
            FramePayload::Error { message } => message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
            FramePayload::AccountSwitch {
                old_account,
                new_account,
                reason,
            } => {
                let from = old_account.as_deref().unwrap_or("?");
                let to = new_account.as_deref().unwrap_or("?");
                match reason {
                    Some(reason) => format!("Switched account {} -> {} ({})", from, to, reason),
                    None => format!("Switched account {} -> {}", from, to),
                }
            }
            FramePayload::TaskComplete { summary } => summary
                .clone()
                .unwrap_or_else(|| "Task complete".to_string()),
            FramePayload::Unknown { data, .. } => match data.get("content").and_then(Value::as_str)
            {
                Some(text) => text.to_string(),
                None => Value::Object(data.clone()).to_string(),
            },
        }
    }
}
