//! Periodic snapshot refresh
//!
//! One task fetches sessions, accounts and projects on a fixed interval and
//! replaces the store's lists. A cycle runs to completion before the next
//! tick is considered, so cycles never overlap; a slow cycle delays the
//! following tick instead of stacking requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::error::{CockpitError, Result};
use crate::store::ClientStore;

/// Fixed-interval refresh of the store's snapshot lists
#[derive(Debug, Clone)]
pub struct RefreshLoop {
    api: ApiClient,
    store: ClientStore,
    interval: Duration,
    cycles: Arc<watch::Sender<u64>>,
}

impl RefreshLoop {
    pub fn new(api: ApiClient, store: ClientStore, interval: Duration) -> Self {
        let (cycles, _) = watch::channel(0);
        Self {
            api,
            store,
            interval,
            cycles: Arc::new(cycles),
        }
    }

    /// Number of completed cycles, successful or not
    pub fn cycles(&self) -> watch::Receiver<u64> {
        self.cycles.subscribe()
    }

    /// Run one refresh cycle
    ///
    /// On success all lists are replaced; on failure the lists are kept and
    /// the error is written to the store's error slot.
    pub async fn refresh_once(&self) -> Result<()> {
        self.store.set_loading(true);
        let result = tokio::try_join!(
            self.api.list_sessions(),
            self.api.list_accounts(),
            self.api.list_projects(),
        );
        self.store.set_loading(false);
        self.cycles.send_modify(|n| *n += 1);

        match result {
            Ok((sessions, accounts, projects)) => {
                tracing::debug!(
                    sessions = sessions.len(),
                    accounts = accounts.len(),
                    projects = projects.len(),
                    "Refreshed snapshots"
                );
                self.store.replace_snapshots(sessions, accounts, projects);
                Ok(())
            }
            Err(e) => {
                let message = match e.downcast_ref::<CockpitError>() {
                    Some(CockpitError::Api { detail, .. }) => detail.clone(),
                    _ => e.to_string(),
                };
                tracing::warn!(error = %e, "Snapshot refresh failed");
                self.store.set_error(Some(message));
                Err(e)
            }
        }
    }

    /// Refresh immediately and then every interval until `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = self.interval.as_millis() as u64, "Refresh loop started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        // Errors are already recorded in the store.
                        let _ = self.refresh_once().await;
                    }
                }
            }
            tracing::info!("Refresh loop stopped");
        })
    }
}
