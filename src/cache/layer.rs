//! Offline cache middleware
//!
//! [`OfflineCacheLayer`] wraps any fetch service and routes each request by
//! class:
//!
//! | Request              | Strategy                                         |
//! |----------------------|--------------------------------------------------|
//! | not `http`/`https`   | passed through untouched                         |
//! | API path (`/api/..`) | network first, then the `api` namespace, then 503 |
//! | anything else        | cache first, then network, then shell or 503     |
//!
//! Requests routed through the cache never fail: a network error resolves
//! to a cached entry or a synthesized `503`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use reqwest::Method;
use tower::{Layer, Service};
use url::Url;

use crate::cache::namespace::CacheNamespaces;
use crate::cache::request::{FetchRequest, FetchResponse};
use crate::cache::storage::CacheStorage;
use crate::endpoints::Endpoints;
use crate::error::Result;

/// Body of the 503 returned for an uncached API request while offline
pub const API_OFFLINE_MESSAGE: &str = "API unavailable offline";
/// Body of the 503 returned for an uncached static request while offline
pub const RESOURCE_OFFLINE_MESSAGE: &str = "Resource unavailable offline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Bypass,
    NetworkFirst,
    CacheFirst,
}

/// Shared cache state used by the middleware and the orchestrator
#[derive(Debug, Clone)]
pub struct OfflineCache {
    storage: Arc<dyn CacheStorage>,
    namespaces: CacheNamespaces,
    api_prefix: String,
    shell_key: String,
}

impl OfflineCache {
    /// Create the cache for `endpoints`, with the shell document at
    /// `shell_path`
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        namespaces: CacheNamespaces,
        endpoints: &Endpoints,
        shell_path: &str,
    ) -> Self {
        let api_prefix = endpoints.api(&[]).path().trim_end_matches('/').to_string();
        let shell_key = FetchRequest::get(endpoints.asset(shell_path)).cache_key();
        Self {
            storage,
            namespaces,
            api_prefix,
            shell_key,
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn namespaces(&self) -> &CacheNamespaces {
        &self.namespaces
    }

    fn is_api(&self, url: &Url) -> bool {
        url.path()
            .strip_prefix(self.api_prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    fn route(&self, request: &FetchRequest) -> Route {
        if !request.is_http() {
            Route::Bypass
        } else if self.is_api(&request.url) {
            Route::NetworkFirst
        } else {
            Route::CacheFirst
        }
    }

    /// Store a copy of `response`; failures are logged and absorbed
    async fn store(&self, namespace: &str, key: &str, response: &FetchResponse) {
        if let Err(e) = self.storage.put(namespace, key, response).await {
            tracing::warn!(namespace, key, error = %e, "Failed to store cache entry");
        }
    }

    async fn lookup_in(&self, namespace: &str, key: &str) -> Option<FetchResponse> {
        self.storage
            .match_in(namespace, key)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(namespace, key, error = %e, "Cache lookup failed");
                None
            })
    }

    async fn lookup_any(&self, key: &str) -> Option<FetchResponse> {
        self.storage.match_any(key).await.unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Cache lookup failed");
            None
        })
    }

    async fn network_first<S>(&self, request: FetchRequest, mut network: S) -> FetchResponse
    where
        S: Service<FetchRequest, Response = FetchResponse, Error = anyhow::Error>,
    {
        let key = request.cache_key();
        let cacheable = request.method == Method::GET;
        let namespace = self.namespaces.api();

        match network.call(request).await {
            Ok(response) => {
                if cacheable && response.is_ok() {
                    self.store(&namespace, &key, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "API request failed, trying cache");
                match self.lookup_in(&namespace, &key).await {
                    Some(cached) => {
                        tracing::info!(key = %key, namespace = %namespace, "Serving cached API response");
                        cached
                    }
                    None => FetchResponse::offline(API_OFFLINE_MESSAGE),
                }
            }
        }
    }

    async fn cache_first<S>(&self, request: FetchRequest, mut network: S) -> FetchResponse
    where
        S: Service<FetchRequest, Response = FetchResponse, Error = anyhow::Error>,
    {
        let key = request.cache_key();
        if let Some(cached) = self.lookup_any(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return cached;
        }

        let cacheable = request.method == Method::GET;
        let navigation = request.is_navigation();
        match network.call(request).await {
            Ok(response) => {
                if cacheable && response.is_ok() {
                    self.store(&self.namespaces.runtime(), &key, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Static request failed");
                if navigation {
                    if let Some(shell) = self.lookup_any(&self.shell_key).await {
                        return shell;
                    }
                }
                FetchResponse::offline(RESOURCE_OFFLINE_MESSAGE)
            }
        }
    }
}

/// [`Layer`] that adds offline caching to a fetch service
#[derive(Debug, Clone)]
pub struct OfflineCacheLayer {
    cache: OfflineCache,
}

impl OfflineCacheLayer {
    pub fn new(cache: OfflineCache) -> Self {
        Self { cache }
    }
}

impl<S> Layer<S> for OfflineCacheLayer {
    type Service = OfflineCacheService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OfflineCacheService {
            inner,
            cache: self.cache.clone(),
        }
    }
}

/// Fetch service produced by [`OfflineCacheLayer`]
#[derive(Debug, Clone)]
pub struct OfflineCacheService<S> {
    inner: S,
    cache: OfflineCache,
}

impl<S> Service<FetchRequest> for OfflineCacheService<S>
where
    S: Service<FetchRequest, Response = FetchResponse, Error = anyhow::Error>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = FetchResponse;
    type Error = anyhow::Error;
    type Future = Pin<Box<dyn Future<Output = Result<FetchResponse>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: FetchRequest) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let cache = self.cache.clone();

        Box::pin(async move {
            match cache.route(&request) {
                Route::Bypass => inner.call(request).await,
                Route::NetworkFirst => Ok(cache.network_first(request, inner).await),
                Route::CacheFirst => Ok(cache.cache_first(request, inner).await),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::storage::MemoryCacheStorage;
    use crate::error::CockpitError;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Debug, Default)]
    struct NetworkState {
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    #[derive(Debug, Clone, Default)]
    struct FakeNetwork(Arc<NetworkState>);

    impl Service<FetchRequest> for FakeNetwork {
        type Response = FetchResponse;
        type Error = anyhow::Error;
        type Future = Pin<Box<dyn Future<Output = Result<FetchResponse>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: FetchRequest) -> Self::Future {
            let state = Arc::clone(&self.0);
            Box::pin(async move {
                state.calls.fetch_add(1, Ordering::SeqCst);
                if state.offline.load(Ordering::SeqCst) {
                    return Err(CockpitError::Network("offline".to_string()).into());
                }
                let status = if request.url.path().ends_with("/missing") {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::OK
                };
                Ok(FetchResponse::new(
                    status,
                    format!("body of {}", request.url.path()),
                ))
            })
        }
    }

    fn network(state: Arc<NetworkState>) -> FakeNetwork {
        FakeNetwork(state)
    }

    fn setup() -> (OfflineCache, Arc<NetworkState>, Arc<MemoryCacheStorage>) {
        let storage = Arc::new(MemoryCacheStorage::new());
        let endpoints = Endpoints::new("http://cockpit.test").unwrap();
        let cache = OfflineCache::new(
            storage.clone(),
            CacheNamespaces::new("cockpit", "v1"),
            &endpoints,
            "/index.html",
        );
        (cache, Arc::new(NetworkState::default()), storage)
    }

    fn url(path: &str) -> Url {
        Url::parse("http://cockpit.test").unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn test_offline_api_get_serves_previous_body() {
        let (cache, net, _) = setup();
        let service = OfflineCacheLayer::new(cache).layer(network(net.clone()));

        let online = service
            .clone()
            .oneshot(FetchRequest::get(url("/api/sessions")))
            .await
            .unwrap();
        net.offline.store(true, Ordering::SeqCst);
        let offline = service
            .oneshot(FetchRequest::get(url("/api/sessions")))
            .await
            .unwrap();

        assert_eq!(offline.status, StatusCode::OK);
        assert_eq!(offline.body, online.body);
    }

    #[tokio::test]
    async fn test_offline_api_without_cache_is_503() {
        let (cache, net, _) = setup();
        net.offline.store(true, Ordering::SeqCst);
        let service = OfflineCacheLayer::new(cache).layer(network(net));

        let response = service
            .oneshot(FetchRequest::get(url("/api/accounts")))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.text(), API_OFFLINE_MESSAGE);
    }

    #[tokio::test]
    async fn test_api_post_and_errors_are_not_cached() {
        let (cache, net, storage) = setup();
        let service = OfflineCacheLayer::new(cache).layer(network(net));

        service
            .clone()
            .oneshot(FetchRequest::new(Method::POST, url("/api/sessions")))
            .await
            .unwrap();
        service
            .oneshot(FetchRequest::get(url("/api/missing")))
            .await
            .unwrap();
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_is_network_first_even_when_cached() {
        let (cache, net, _) = setup();
        let service = OfflineCacheLayer::new(cache).layer(network(net.clone()));

        for _ in 0..2 {
            service
                .clone()
                .oneshot(FetchRequest::get(url("/api/sessions")))
                .await
                .unwrap();
        }
        assert_eq!(net.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_static_is_cache_first() {
        let (cache, net, storage) = setup();
        let service = OfflineCacheLayer::new(cache).layer(network(net.clone()));

        for _ in 0..2 {
            let response = service
                .clone()
                .oneshot(FetchRequest::get(url("/app.js")))
                .await
                .unwrap();
            assert_eq!(response.text(), "body of /app.js");
        }
        assert_eq!(net.calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.keys().await.unwrap(), vec!["cockpit-runtime-v1"]);
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_shell() {
        let (cache, net, storage) = setup();
        storage
            .put(
                "cockpit-assets-v1",
                "GET http://cockpit.test/index.html",
                &FetchResponse::new(StatusCode::OK, "<html>shell</html>"),
            )
            .await
            .unwrap();
        net.offline.store(true, Ordering::SeqCst);
        let service = OfflineCacheLayer::new(cache).layer(network(net));

        let page = service
            .clone()
            .oneshot(FetchRequest::navigate(url("/sessions/42")))
            .await
            .unwrap();
        assert_eq!(page.text(), "<html>shell</html>");

        let asset = service
            .oneshot(FetchRequest::get(url("/logo.png")))
            .await
            .unwrap();
        assert_eq!(asset.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(asset.text(), RESOURCE_OFFLINE_MESSAGE);
    }

    #[tokio::test]
    async fn test_navigation_over_cold_cache_is_503() {
        let (cache, net, _) = setup();
        net.offline.store(true, Ordering::SeqCst);
        let service = OfflineCacheLayer::new(cache).layer(network(net));

        let page = service
            .oneshot(FetchRequest::navigate(url("/")))
            .await
            .unwrap();
        assert_eq!(page.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_non_http_bypasses_cache() {
        let (cache, net, storage) = setup();
        net.offline.store(true, Ordering::SeqCst);
        let service = OfflineCacheLayer::new(cache).layer(network(net));

        let result = service
            .oneshot(FetchRequest::get(
                Url::parse("ws://cockpit.test/ws/sessions/1").unwrap(),
            ))
            .await;
        assert!(result.is_err());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[test]
    fn test_api_prefix_requires_segment_boundary() {
        let (cache, _, _) = setup();
        assert!(cache.is_api(&url("/api/sessions")));
        assert!(!cache.is_api(&url("/apiary")));
        assert!(!cache.is_api(&url("/index.html")));
    }
}
