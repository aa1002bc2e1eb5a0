//! Configuration management for Cockpit
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CockpitError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Cockpit
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Snapshot refresh loop settings
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Offline cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Persisted state storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the backend (REST and WebSocket share the host)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout for REST calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Snapshot refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Period of the snapshot refresh timer (seconds)
    #[serde(default = "default_refresh_interval")]
    pub interval_seconds: u64,
}

fn default_refresh_interval() -> u64 {
    5
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_refresh_interval(),
        }
    }
}

impl RefreshConfig {
    /// Refresh period as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Offline cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Application prefix embedded in every namespace name
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Version tag embedded in every namespace name
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Paths fetched into the assets namespace at install time
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Shell document served for failed navigation requests
    #[serde(default = "default_shell_path")]
    pub shell_path: String,

    /// Keep cache namespaces in the sqlite state database across runs
    #[serde(default)]
    pub persistent: bool,
}

fn default_app_name() -> String {
    "cockpit".to_string()
}

fn default_cache_version() -> String {
    "v1".to_string()
}

fn default_precache() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
    ]
}

fn default_shell_path() -> String {
    "/index.html".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            version: default_cache_version(),
            precache: default_precache(),
            shell_path: default_shell_path(),
            persistent: false,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether notifications are permitted at all
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,

    /// Icon applied when a notification request carries none
    #[serde(default = "default_icon")]
    pub default_icon: String,
}

fn default_notifications_enabled() -> bool {
    true
}

fn default_icon() -> String {
    "/icon-192.png".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
            default_icon: default_icon(),
        }
    }
}

/// Persisted state storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Explicit path of the state database; defaults to the user data dir
    #[serde(default)]
    pub state_db: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Optional file that receives a copy of every log line
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "cockpit=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CockpitError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CockpitError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("COCKPIT_BASE_URL") {
            self.server.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("COCKPIT_REQUEST_TIMEOUT") {
            match timeout.parse() {
                Ok(value) => self.server.request_timeout_seconds = value,
                Err(_) => tracing::warn!("Invalid COCKPIT_REQUEST_TIMEOUT: {}", timeout),
            }
        }

        if let Ok(interval) = std::env::var("COCKPIT_REFRESH_INTERVAL") {
            match interval.parse() {
                Ok(value) => self.refresh.interval_seconds = value,
                Err(_) => tracing::warn!("Invalid COCKPIT_REFRESH_INTERVAL: {}", interval),
            }
        }

        if let Ok(version) = std::env::var("COCKPIT_CACHE_VERSION") {
            tracing::debug!(version = %version, "Env override: COCKPIT_CACHE_VERSION");
            self.cache.version = version;
        }

        if let Ok(level) = std::env::var("COCKPIT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("COCKPIT_JSON_LOGS") {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json_format = v,
                Err(_) => tracing::warn!("Invalid value for COCKPIT_JSON_LOGS: {}", json_logs),
            }
        }

        if let Ok(db) = std::env::var("COCKPIT_STATE_DB") {
            self.storage.state_db = Some(PathBuf::from(db));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.server.base_url = base_url.clone();
        }
        if cli.verbose {
            self.logging.level = "cockpit=debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.server.base_url).map_err(|e| {
            CockpitError::Config(format!(
                "Invalid server.base_url '{}': {}",
                self.server.base_url, e
            ))
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(CockpitError::Config(format!(
                "server.base_url must use http or https, got '{}'",
                base.scheme()
            ))
            .into());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(CockpitError::Config(
                "server.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.refresh.interval_seconds == 0 {
            return Err(CockpitError::Config(
                "refresh.interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.cache.app_name.trim().is_empty() {
            return Err(
                CockpitError::Config("cache.app_name cannot be empty".to_string()).into(),
            );
        }

        if self.cache.version.trim().is_empty() {
            return Err(CockpitError::Config("cache.version cannot be empty".to_string()).into());
        }

        if !self.cache.shell_path.starts_with('/') {
            return Err(CockpitError::Config(
                "cache.shell_path must be an absolute path".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.refresh.interval_seconds, 5);
        assert_eq!(config.cache.app_name, "cockpit");
        assert_eq!(config.cache.version, "v1");
        assert_eq!(
            config.cache.precache,
            vec!["/", "/index.html", "/manifest.json"]
        );
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_ws_scheme() {
        let mut config = Config::default();
        config.server.base_url = "ws://localhost:8000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_garbage_url() {
        let mut config = Config::default();
        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default();
        config.refresh.interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_version() {
        let mut config = Config::default();
        config.cache.version = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
server:
  base_url: "https://cockpit.example.com"
refresh:
  interval_seconds: 10
cache:
  version: "v7"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.base_url, "https://cockpit.example.com");
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert_eq!(config.refresh.interval_seconds, 10);
        assert_eq!(config.cache.version, "v7");
        assert_eq!(config.cache.app_name, "cockpit");
        assert!(config.notifications.enabled);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("COCKPIT_BASE_URL", "http://10.0.0.2:9000");
        std::env::set_var("COCKPIT_REFRESH_INTERVAL", "12");
        std::env::set_var("COCKPIT_CACHE_VERSION", "v3");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("COCKPIT_BASE_URL");
        std::env::remove_var("COCKPIT_REFRESH_INTERVAL");
        std::env::remove_var("COCKPIT_CACHE_VERSION");

        assert_eq!(config.server.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.refresh.interval_seconds, 12);
        assert_eq!(config.cache.version, "v3");
    }

    #[test]
    #[serial]
    fn test_invalid_env_interval_is_ignored() {
        std::env::set_var("COCKPIT_REFRESH_INTERVAL", "soon");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("COCKPIT_REFRESH_INTERVAL");
        assert_eq!(config.refresh.interval_seconds, 5);
    }
}
