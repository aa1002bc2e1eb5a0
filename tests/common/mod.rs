use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cockpit::client::CockpitClient;
use cockpit::config::Config;
use cockpit::connection::TungsteniteConnector;
use cockpit::notify::LogNotifier;
use cockpit::storage::SqliteStorage;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("state.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Default config pointed at `base_url`
#[allow(dead_code)]
pub fn config_for(base_url: &str) -> Config {
    let mut config = Config::default();
    config.server.base_url = base_url.to_string();
    config.server.request_timeout_seconds = 5;
    config
}

/// In-memory client with the real socket connector
#[allow(dead_code)]
pub fn test_client(base_url: &str) -> CockpitClient {
    CockpitClient::with_parts(
        config_for(base_url),
        Arc::new(TungsteniteConnector::new()),
        Arc::new(LogNotifier),
        None,
    )
    .expect("failed to build client")
}

/// Poll `check` until it holds or two seconds pass
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
