//! Health check and the refresh loop

use chrono::Local;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::client::CockpitClient;
use crate::error::Result;
use crate::store::StoreState;

/// Print the backend health document
pub async fn health(client: &CockpitClient) -> Result<()> {
    let health = client.api().health().await?;
    for (key, value) in &health {
        match value {
            serde_json::Value::String(text) => println!("{}: {}", key, text),
            other => println!("{}: {}", key, other),
        }
    }
    Ok(())
}

/// One line describing the store after a refresh cycle
pub fn summary_line(state: &StoreState) -> String {
    if let Some(error) = &state.error {
        return format!("refresh failed: {}", error);
    }
    let limited = state.accounts.iter().filter(|a| a.is_rate_limited).count();
    format!(
        "{} sessions, {} accounts ({} rate limited), {} projects",
        state.sessions.len(),
        state.accounts.len(),
        limited,
        state.projects.len()
    )
}

/// Run the refresh loop, printing a summary after every cycle
///
/// Stops on Ctrl-C or after `cycles` cycles.
pub async fn run_watch(client: &CockpitClient, cycles: Option<u64>) -> Result<()> {
    client.install_cache().await;

    let cancel = CancellationToken::new();
    let refresh = client.refresh_loop();
    let mut completed = refresh.cycles();
    let task = refresh.spawn(cancel.clone());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = completed.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = *completed.borrow_and_update();
                let state = client.store().snapshot();
                let line = summary_line(&state);
                let stamp = Local::now().format("%H:%M:%S").to_string();
                if state.error.is_some() {
                    println!("{} {}", stamp.dimmed(), line.red());
                } else {
                    println!("{} {}", stamp.dimmed(), line);
                }
                if cycles.is_some_and(|limit| count >= limit) {
                    break;
                }
            }
        }
    }

    cancel.cancel();
    let _ = task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_counts() {
        let state = StoreState {
            accounts: serde_json::from_str(
                r#"[{"id":"a","is_rate_limited":true},{"id":"b"}]"#,
            )
            .unwrap(),
            ..Default::default()
        };
        assert_eq!(
            summary_line(&state),
            "0 sessions, 2 accounts (1 rate limited), 0 projects"
        );
    }

    #[test]
    fn test_summary_line_reports_error() {
        let state = StoreState {
            error: Some("API unavailable offline".to_string()),
            ..Default::default()
        };
        assert_eq!(summary_line(&state), "refresh failed: API unavailable offline");
    }
}
