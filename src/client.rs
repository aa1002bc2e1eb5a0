//! Client composition root
//!
//! [`CockpitClient`] wires the configured pieces together: one fetch stack
//! shared by the REST client and the cache orchestrator, one connection
//! manager, one store, one notification center. Command handlers work
//! against this type only.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::cache::orchestrator::precache_urls;
use crate::cache::{
    CacheNamespaces, CacheOrchestrator, CacheStorage, HttpFetcher, MemoryCacheStorage, OfflineCache,
};
use crate::config::Config;
use crate::connection::{AuthTerminal, ConnectionManager, SocketConnector, TungsteniteConnector};
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::notify::{NotificationCenter, Notifier, TerminalNotifier};
use crate::storage::{SqliteCacheStorage, SqliteStorage};
use crate::store::refresh::RefreshLoop;
use crate::store::ClientStore;

/// Fully wired client
#[derive(Debug, Clone)]
pub struct CockpitClient {
    config: Config,
    endpoints: Endpoints,
    fetcher: HttpFetcher,
    api: ApiClient,
    connector: Arc<dyn SocketConnector>,
    connections: Arc<ConnectionManager>,
    store: ClientStore,
    notifications: NotificationCenter,
    orchestrator: Arc<CacheOrchestrator>,
}

impl CockpitClient {
    /// Build the client for `config` with the real socket connector, the
    /// terminal notifier and the sqlite state database
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the state database
    /// cannot be opened.
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = SqliteStorage::from_config(&config.storage)?;
        Self::with_parts(
            config,
            Arc::new(TungsteniteConnector::new()),
            Arc::new(TerminalNotifier),
            Some(storage),
        )
    }

    /// Build the client from explicit collaborators
    ///
    /// Without `storage` the store is in-memory and the cache is never
    /// persisted, whatever `config.cache.persistent` says.
    pub fn with_parts(
        config: Config,
        connector: Arc<dyn SocketConnector>,
        notifier: Arc<dyn Notifier>,
        storage: Option<SqliteStorage>,
    ) -> Result<Self> {
        let endpoints = Endpoints::new(&config.server.base_url)?;
        let fetcher = HttpFetcher::new(config.server.request_timeout())?;

        let cache_storage: Arc<dyn CacheStorage> = match &storage {
            Some(storage) if config.cache.persistent => {
                Arc::new(SqliteCacheStorage::new(storage.clone()))
            }
            _ => Arc::new(MemoryCacheStorage::new()),
        };
        let namespaces = CacheNamespaces::new(&config.cache.app_name, &config.cache.version);
        let cache = OfflineCache::new(cache_storage, namespaces, &endpoints, &config.cache.shell_path);

        let notifications = NotificationCenter::new(
            notifier,
            config.notifications.enabled,
            config.notifications.default_icon.clone(),
        );
        let orchestrator = Arc::new(CacheOrchestrator::new(
            cache,
            precache_urls(&endpoints, &config.cache.precache),
            notifications.clone(),
        ));

        let api = ApiClient::new(endpoints.clone(), fetcher.clone(), orchestrator.layer());
        let connections = Arc::new(ConnectionManager::new(connector.clone(), endpoints.clone()));
        let store = match storage {
            Some(storage) => ClientStore::with_storage(storage)?,
            None => ClientStore::new(),
        };

        tracing::debug!(base_url = %endpoints.base(), "Client initialized");
        Ok(Self {
            config,
            endpoints,
            fetcher,
            api,
            connector,
            connections,
            store,
            notifications,
            orchestrator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn orchestrator(&self) -> &Arc<CacheOrchestrator> {
        &self.orchestrator
    }

    /// Install and activate the offline cache
    ///
    /// A failed install is logged and otherwise ignored; the client keeps
    /// working against the network.
    pub async fn install_cache(&self) {
        if let Err(e) = self.orchestrator.install(self.fetcher.clone()).await {
            tracing::warn!(error = %e, "Offline cache install failed");
        }
    }

    /// Delete cache namespaces left behind by other cache versions
    ///
    /// Runs at startup whether or not an install later succeeds, so old
    /// versions never accumulate in the persistent cache.
    pub async fn purge_stale_cache(&self) {
        match self.orchestrator.purge_stale().await {
            Ok(deleted) if !deleted.is_empty() => {
                tracing::info!(count = deleted.len(), "Purged old cache versions");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Purging old cache versions failed"),
        }
    }

    /// Select `session_id` in the store and point the stream at it
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted selection cannot be saved.
    pub async fn select_session(&self, session_id: Option<&str>) -> Result<()> {
        self.store.select_session(session_id.map(str::to_string))?;
        self.connections.select_session(session_id).await;
        Ok(())
    }

    /// Mirror connection events into the store
    pub fn attach_store(&self) -> JoinHandle<()> {
        self.store.attach(self.connections.clone())
    }

    /// Refresh loop over this client's API and store
    pub fn refresh_loop(&self) -> RefreshLoop {
        RefreshLoop::new(self.api.clone(), self.store.clone(), self.config.refresh.interval())
    }

    /// Open the authentication stream for `account_id`
    pub fn open_auth(&self, account_id: &str) -> AuthTerminal {
        AuthTerminal::open(
            self.connector.clone(),
            account_id,
            self.endpoints.auth_socket(account_id),
        )
    }
}
