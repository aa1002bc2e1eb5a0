/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint. Each
handler takes a wired [`CockpitClient`](crate::client::CockpitClient) and
prints to stdout; diagnostics go through `tracing` to stderr.

- `sessions`: session listing and lifecycle
- `attach`: live session stream with stdin input
- `auth`: interactive account authentication
- `accounts`: account listing and maintenance
- `projects`: project CRUD
- `repos`: repository listing and directory browsing
- `templates`: local session templates
- `watch`: health check and the periodic refresh loop
*/

use serde::Serialize;

use crate::error::Result;

pub mod accounts;
pub mod attach;
pub mod auth;
pub mod projects;
pub mod repos;
pub mod sessions;
pub mod templates;
pub mod watch;

/// Print `value` as pretty JSON
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
