//! Offline cache integration tests
//!
//! Exercises install, activation and the cache-first static path with the
//! real reqwest fetcher against a `wiremock` backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tower::{Layer, ServiceExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cockpit::cache::orchestrator::precache_urls;
use cockpit::cache::{
    CacheNamespaces, CacheOrchestrator, CacheStorage, FetchRequest, FetchResponse, HttpFetcher,
    LifecycleState, MemoryCacheStorage, OfflineCache,
};
use cockpit::client::CockpitClient;
use cockpit::connection::TungsteniteConnector;
use cockpit::endpoints::Endpoints;
use cockpit::notify::{LogNotifier, NotificationCenter};
use cockpit::storage::SqliteCacheStorage;

const SHELL: &str = "<!doctype html><title>cockpit</title>";

async fn mount_shell(server: &MockServer) {
    for route in ["/", "/index.html"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(SHELL))
            .mount(server)
            .await;
    }
}

fn orchestrator(
    storage: Arc<dyn CacheStorage>,
    endpoints: &Endpoints,
    version: &str,
    manifest: &[&str],
) -> CacheOrchestrator {
    let cache = OfflineCache::new(
        storage,
        CacheNamespaces::new("cockpit", version),
        endpoints,
        "/index.html",
    );
    let manifest: Vec<String> = manifest.iter().map(|p| p.to_string()).collect();
    CacheOrchestrator::new(
        cache,
        precache_urls(endpoints, &manifest),
        NotificationCenter::new(Arc::new(LogNotifier), true, "/icon-192.png"),
    )
}

fn fetcher(timeout_secs: u64) -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(timeout_secs)).expect("fetcher")
}

#[tokio::test]
async fn test_install_precaches_and_activates() {
    let server = MockServer::start().await;
    mount_shell(&server).await;
    let endpoints = Endpoints::new(&server.uri()).unwrap();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());

    let orchestrator = orchestrator(storage.clone(), &endpoints, "v1", &["/", "/index.html"]);
    orchestrator.install(fetcher(5)).await.expect("install");

    assert_eq!(orchestrator.state(), LifecycleState::Activated);
    let cached = orchestrator
        .cached(&endpoints.asset("/index.html"))
        .await
        .unwrap()
        .expect("shell cached");
    assert_eq!(cached.text(), SHELL);
    assert_eq!(storage.keys().await.unwrap(), vec!["cockpit-assets-v1".to_string()]);
}

#[tokio::test]
async fn test_failed_precache_stores_nothing() {
    let server = MockServer::start().await;
    mount_shell(&server).await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let endpoints = Endpoints::new(&server.uri()).unwrap();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());

    let orchestrator = orchestrator(
        storage.clone(),
        &endpoints,
        "v1",
        &["/", "/index.html", "/manifest.json"],
    );
    assert!(orchestrator.install(fetcher(5)).await.is_err());

    assert_eq!(orchestrator.state(), LifecycleState::Redundant);
    assert!(storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_new_version_deletes_old_namespaces() {
    let server = MockServer::start().await;
    mount_shell(&server).await;
    let endpoints = Endpoints::new(&server.uri()).unwrap();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());

    let v1 = orchestrator(storage.clone(), &endpoints, "v1", &["/"]);
    v1.install(fetcher(5)).await.expect("install v1");

    let v2 = orchestrator(storage.clone(), &endpoints, "v2", &["/"]).wait_for_skip();
    v2.install(fetcher(5)).await.expect("install v2");
    assert_eq!(v2.state(), LifecycleState::Installed);
    assert_eq!(storage.keys().await.unwrap().len(), 2);

    let deleted = v2.activate().await.expect("activate v2");
    assert_eq!(deleted, vec!["cockpit-assets-v1".to_string()]);
    assert_eq!(storage.keys().await.unwrap(), vec!["cockpit-assets-v2".to_string()]);
}

#[tokio::test]
async fn test_navigation_falls_back_to_shell_when_unreachable() {
    let server = MockServer::start().await;
    mount_shell(&server).await;
    Mock::given(method("GET"))
        .and(path("/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let endpoints = Endpoints::new(&server.uri()).unwrap();
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());

    let orchestrator = orchestrator(storage, &endpoints, "v1", &["/index.html"]);
    orchestrator.install(fetcher(5)).await.expect("install");

    let service = orchestrator.layer().layer(fetcher(1));
    let response = service
        .clone()
        .oneshot(FetchRequest::navigate(endpoints.asset("/sessions/s1")))
        .await
        .expect("navigation never fails");
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), SHELL);

    let asset = service
        .oneshot(FetchRequest::get(endpoints.asset("/sessions/s1")))
        .await
        .expect("asset never fails");
    assert_eq!(asset.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(asset.text(), "Resource unavailable offline");
}

#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
    let server = MockServer::start().await;
    mount_shell(&server).await;
    let endpoints = Endpoints::new(&server.uri()).unwrap();
    let (storage, _dir) = common::create_temp_storage();

    let first: Arc<dyn CacheStorage> = Arc::new(SqliteCacheStorage::new(storage.clone()));
    orchestrator(first, &endpoints, "v1", &["/index.html"])
        .install(fetcher(5))
        .await
        .expect("install");

    let reopened: Arc<dyn CacheStorage> = Arc::new(SqliteCacheStorage::new(storage));
    let cached = reopened
        .match_any(&FetchRequest::get(endpoints.asset("/index.html")).cache_key())
        .await
        .unwrap()
        .expect("entry persisted");
    assert_eq!(cached.text(), SHELL);
}

#[tokio::test]
async fn test_startup_purges_old_versions_without_install() {
    let (storage, _dir) = common::create_temp_storage();
    let cache = SqliteCacheStorage::new(storage.clone());
    let stored = FetchResponse::new(StatusCode::OK, "stale");
    for name in ["cockpit-api-v0", "cockpit-assets-v1"] {
        cache.put(name, "GET http://localhost/", &stored).await.unwrap();
    }

    let mut config = common::config_for("http://127.0.0.1:9");
    config.cache.persistent = true;
    let client = CockpitClient::with_parts(
        config,
        Arc::new(TungsteniteConnector::new()),
        Arc::new(LogNotifier),
        Some(storage),
    )
    .unwrap();
    client.purge_stale_cache().await;

    assert_eq!(cache.keys().await.unwrap(), vec!["cockpit-assets-v1".to_string()]);
    assert_eq!(
        client.orchestrator().state(),
        LifecycleState::Parsed,
        "purging must not advance the lifecycle"
    );
}
