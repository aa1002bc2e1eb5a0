//! Cockpit - remote control client library for agent sessions
//!
//! This library provides the client side of a session backend: typed REST
//! access behind an offline cache, one live streaming connection for the
//! selected session, ANSI decoding of terminal output, and an observable
//! client state store.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `protocol`: streaming frame parsing and outbound frames
//! - `ansi`: ANSI SGR decoding into styled segments
//! - `connection`: per-session WebSocket lifecycle and the auth stream
//! - `cache`: offline-resilient fetch stack and its lifecycle
//! - `api`: REST client and models
//! - `store`: client state, persistence and the refresh loop
//! - `notify`: system notifications
//! - `storage`: sqlite persistence
//! - `render`: terminal output and tables
//! - `client`: the composition root used by the CLI
//! - `config`, `error`, `logging`, `cli`, `commands`: ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use cockpit::{CockpitClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = CockpitClient::from_config(config)?;
//!     for session in client.api().list_sessions().await? {
//!         println!("{} {}", session.id, session.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ansi;
pub mod api;
pub mod cache;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod endpoints;
pub mod error;
pub mod logging;
pub mod notify;
pub mod protocol;
pub mod render;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use client::CockpitClient;
pub use config::Config;
pub use connection::{ConnectionManager, ConnectionState, ConnectionStatus};
pub use error::{CockpitError, Result};
pub use protocol::{parse, Frame, FramePayload};
pub use store::{ClientStore, StoreState};
