//! Offline cache lifecycle and control channel
//!
//! [`CacheOrchestrator`] owns the install/activate lifecycle of one cache
//! version and answers control messages from the client:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |
//!               +-> Redundant (precache failed)
//! ```
//!
//! Install precaches the shell manifest into the `assets` namespace and,
//! unless configured otherwise, activates right away instead of waiting.
//! Activation deletes every namespace of this application that does not
//! carry the current version.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower::{Service, ServiceExt};
use url::Url;

use crate::cache::layer::{
    OfflineCache, OfflineCacheLayer, API_OFFLINE_MESSAGE, RESOURCE_OFFLINE_MESSAGE,
};
use crate::cache::request::{FetchRequest, FetchResponse};
use crate::error::{CockpitError, Result};
use crate::notify::{NotificationCenter, NotificationOptions};

/// Lifecycle state of a cache version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    /// Installed and waiting to activate
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never activate
    Redundant,
}

/// Message from the client to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting version now
    SkipWaiting,
    /// Show a system notification
    ShowNotification { options: NotificationOptions },
}

impl ControlMessage {
    /// Parse a control message from its JSON form
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| CockpitError::Cache(format!("invalid control message: {}", e)).into())
    }
}

/// Lifecycle owner of one cache version
#[derive(Debug)]
pub struct CacheOrchestrator {
    cache: OfflineCache,
    precache: Vec<Url>,
    skip_waiting: bool,
    notifications: NotificationCenter,
    state: watch::Sender<LifecycleState>,
}

impl CacheOrchestrator {
    /// Create an orchestrator that will precache `precache` on install
    pub fn new(cache: OfflineCache, precache: Vec<Url>, notifications: NotificationCenter) -> Self {
        let (state, _) = watch::channel(LifecycleState::Parsed);
        Self {
            cache,
            precache,
            skip_waiting: true,
            notifications,
            state,
        }
    }

    /// Stay in `Installed` after install until `SKIP_WAITING` arrives
    pub fn wait_for_skip(mut self) -> Self {
        self.skip_waiting = false;
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Middleware that serves requests through this cache
    pub fn layer(&self) -> OfflineCacheLayer {
        OfflineCacheLayer::new(self.cache.clone())
    }

    fn set_state(&self, next: LifecycleState) {
        tracing::debug!(state = ?next, version = self.cache.namespaces().version(), "Cache lifecycle");
        self.state.send_replace(next);
    }

    /// Install this version and, unless waiting was requested, activate it
    ///
    /// Every manifest entry is fetched through `network` (bypassing the
    /// cache) and must return 2xx; entries are stored only if all succeed.
    ///
    /// # Errors
    ///
    /// Returns [`CockpitError::Cache`] if any entry fails; the version is
    /// then `Redundant`.
    pub async fn install<S>(&self, network: S) -> Result<()>
    where
        S: Service<FetchRequest, Response = FetchResponse, Error = anyhow::Error> + Clone,
    {
        if self.state() != LifecycleState::Parsed {
            return Err(CockpitError::Cache(format!(
                "cannot install from state {:?}",
                self.state()
            ))
            .into());
        }
        self.set_state(LifecycleState::Installing);
        let namespace = self.cache.namespaces().assets();
        tracing::info!(namespace = %namespace, entries = self.precache.len(), "Precaching shell assets");

        let mut fetched = Vec::with_capacity(self.precache.len());
        for url in &self.precache {
            let request = FetchRequest::get(url.clone());
            let key = request.cache_key();
            let result = network.clone().oneshot(request).await;
            match result {
                Ok(response) if response.is_ok() => fetched.push((key, response)),
                Ok(response) => {
                    self.set_state(LifecycleState::Redundant);
                    return Err(CockpitError::Cache(format!(
                        "precache of {} returned {}",
                        url, response.status
                    ))
                    .into());
                }
                Err(e) => {
                    self.set_state(LifecycleState::Redundant);
                    return Err(CockpitError::Cache(format!("precache of {} failed: {}", url, e)).into());
                }
            }
        }

        for (key, response) in &fetched {
            if let Err(e) = self.cache.storage().put(&namespace, key, response).await {
                self.set_state(LifecycleState::Redundant);
                return Err(e);
            }
        }

        self.set_state(LifecycleState::Installed);
        if self.skip_waiting {
            self.activate().await?;
        }
        Ok(())
    }

    /// Activate this version, deleting stale namespaces
    ///
    /// Returns the names of the deleted namespaces. Activating an already
    /// active version is a no-op.
    pub async fn activate(&self) -> Result<Vec<String>> {
        match self.state() {
            LifecycleState::Installed => {}
            LifecycleState::Activated => return Ok(Vec::new()),
            other => {
                return Err(
                    CockpitError::Cache(format!("cannot activate from state {:?}", other)).into(),
                )
            }
        }
        self.set_state(LifecycleState::Activating);
        let deleted = self.purge_stale().await?;
        self.set_state(LifecycleState::Activated);
        tracing::info!(version = self.cache.namespaces().version(), "Cache version active");
        Ok(deleted)
    }

    /// Delete every namespace of this application that does not carry the
    /// current version, leaving the lifecycle state alone
    ///
    /// Returns the names of the deleted namespaces.
    pub async fn purge_stale(&self) -> Result<Vec<String>> {
        let namespaces = self.cache.namespaces();
        let mut deleted = Vec::new();
        for name in self.cache.storage().keys().await? {
            if namespaces.is_stale(&name) {
                tracing::info!(namespace = %name, "Deleting old cache");
                self.cache.storage().delete(&name).await?;
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Handle one control message
    ///
    /// `SHOW_NOTIFICATION` returns the options as shown, or `None` when
    /// permission is not granted.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<Option<NotificationOptions>> {
        match message {
            ControlMessage::SkipWaiting => {
                if self.state() == LifecycleState::Installed {
                    self.activate().await?;
                } else {
                    tracing::debug!(state = ?self.state(), "SKIP_WAITING ignored");
                }
                Ok(None)
            }
            ControlMessage::ShowNotification { options } => self.notifications.show(options).await,
        }
    }

    /// Read a cached entry directly, for diagnostics
    pub async fn cached(&self, url: &Url) -> Result<Option<FetchResponse>> {
        self.cache
            .storage()
            .match_any(&FetchRequest::get(url.clone()).cache_key())
            .await
    }
}

/// Whether `response` is a synthesized offline 503 rather than one sent by
/// the backend
pub fn is_offline_response(response: &FetchResponse) -> bool {
    response.status == StatusCode::SERVICE_UNAVAILABLE
        && (response.body == API_OFFLINE_MESSAGE || response.body == RESOURCE_OFFLINE_MESSAGE)
}

/// Build the orchestrator's precache URLs from manifest paths
pub fn precache_urls(endpoints: &crate::endpoints::Endpoints, paths: &[String]) -> Vec<Url> {
    paths.iter().map(|path| endpoints.asset(path)).collect()
}
