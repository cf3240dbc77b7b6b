//! Config file loading tests.

use presto_connector::config::{Config, ConnectionConfig};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_load_named_connections_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[connections.default]
host = "localhost"

[connections.warehouse]
host = "presto.internal"
protocol = "https"
port = 8443
catalog = "iceberg"
schema = "finance"
username = "dashboards"
password = "hunter2"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();

    let warehouse = config.get_connection(Some("warehouse")).unwrap();
    assert_eq!(warehouse.base_url().unwrap(), "https://presto.internal:8443");
    assert_eq!(warehouse.password(), Some("hunter2"));

    let default = config.get_connection(None).unwrap();
    assert_eq!(default, &ConnectionConfig::new("localhost"));
}

#[test]
fn test_missing_file_gives_empty_config() {
    let dir = tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();
    assert!(config.connections.is_empty());
}

#[test]
fn test_invalid_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[connections.default\nhost = ").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Configuration error"));
    assert!(message.contains("broken.toml"));
}

#[test]
fn test_wrong_port_type_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[connections.default]\nhost = \"h\"\nport = \"eighty\"\n").unwrap();

    assert!(Config::load_from_file(&path).is_err());
}
