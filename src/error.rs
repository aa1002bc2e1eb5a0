//! Error types for Cockpit
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Cockpit operations
///
/// Parsing and cache-layer failures are absorbed at their boundary and only
/// show up here when a caller explicitly asks for them (e.g. `frame::parse`).
/// Connection and API failures propagate as visible state.
#[derive(Error, Debug)]
pub enum CockpitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx REST response, carrying the backend's `detail` message
    #[error("API error ({status}): {detail}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// The `detail` field of the error body, or the status text
        detail: String,
    },

    /// Streaming socket failed to open, errored, or closed unexpectedly
    #[error("Connection error: {0}")]
    Connection(String),

    /// Inbound stream frame could not be decoded
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Network-level fetch failure (no response was received)
    #[error("Network error: {0}")]
    Network(String),

    /// Cache storage failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Persisted state storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Notification delivery failure (permission denial is not an error)
    #[error("Notification error: {0}")]
    Notification(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CockpitError {
    /// Returns true when this error is an API error with the given status
    pub fn is_api_status(&self, expected: u16) -> bool {
        matches!(self, CockpitError::Api { status, .. } if *status == expected)
    }
}

/// Result type alias for Cockpit operations
///
/// Uses `anyhow::Error` so typed [`CockpitError`] values can be wrapped
/// with context and recovered with `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
