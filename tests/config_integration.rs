mod common;

use cockpit::cli::Cli;
use cockpit::config::Config;
use serial_test::serial;

use common::temp_config_file;

#[test]
#[serial]
fn test_load_file_then_cli_override() {
    let (_dir, path) = temp_config_file(
        r#"
server:
  base_url: "http://from-file:8000"
logging:
  level: "cockpit=warn"
cache:
  persistent: true
"#,
    );

    let cli = Cli {
        base_url: Some("http://from-cli:9000".to_string()),
        verbose: true,
        ..Cli::default()
    };
    let config = Config::load(path.to_str().unwrap(), &cli).expect("load config");

    assert_eq!(config.server.base_url, "http://from-cli:9000");
    assert_eq!(config.logging.level, "cockpit=debug");
    assert!(config.cache.persistent);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let config = Config::load("/nonexistent/cockpit.yaml", &Cli::default()).expect("defaults");
    assert_eq!(config.refresh.interval_seconds, 5);
    assert_eq!(config.notifications.default_icon, "/icon-192.png");
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    let (_dir, path) = temp_config_file("server: [not, a, map");
    assert!(Config::load(path.to_str().unwrap(), &Cli::default()).is_err());
}
