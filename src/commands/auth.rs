//! Interactive account authentication
//!
//! Starts the login process on the backend, relays its terminal output and
//! forwards stdin lines until the backend reports the account authenticated.

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::CockpitClient;
use crate::error::{CockpitError, Result};
use crate::render::TerminalRenderer;

/// Authenticate `account_id` interactively
///
/// # Errors
///
/// Returns [`CockpitError::Connection`] if the flow ends without the
/// account being authenticated.
pub async fn authenticate(client: &CockpitClient, account_id: &str) -> Result<()> {
    let terminal = client.open_auth(account_id);
    let mut states = terminal.subscribe();
    let mut renderer = TerminalRenderer::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_error: Option<String> = None;

    tracing::info!(account_id, "Starting authentication stream");
    let finished = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break states.borrow().clone(),
            changed = states.changed() => {
                let state = states.borrow_and_update().clone();
                renderer.update(&state.output)?;
                if state.error.is_some() && state.error != shown_error {
                    if let Some(error) = &state.error {
                        eprintln!("{}", error.red());
                    }
                    shown_error = state.error.clone();
                }
                if state.done || changed.is_err() {
                    break state;
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !terminal.send_input(&line) {
                            tracing::debug!("Auth input not sent");
                        }
                    }
                    None => break states.borrow().clone(),
                }
            }
        }
    };

    terminal.close();
    if finished.done {
        println!("\n{}", "Authentication successful".green());
        Ok(())
    } else {
        Err(CockpitError::Connection(
            finished
                .error
                .unwrap_or_else(|| "Authentication did not complete".to_string()),
        )
        .into())
    }
}
