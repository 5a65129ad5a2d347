//! Tests for loading client settings from TOML.

use std::io::Write;
use std::time::Duration;

use courier_net::session::ClientSettings;
use courier_net::{HostTarget, NetworkError, RetryPolicy};

const FULL: &str = r#"
debug = false

[dns]
servers = ["8.8.8.8", "1.1.1.1"]
max_retries = 3
retry_interval_ms = 500

[endpoint]
host_name = "time.example.com"
host_address = "93.184.216.34"
port = 9999
reply_timeout_ms = 1500
"#;

#[test]
fn test_full_settings() {
    let settings = ClientSettings::from_toml_str(FULL).unwrap();

    assert!(!settings.debug);
    assert_eq!(settings.dns.servers.len(), 2);
    assert_eq!(
        settings.retry_policy(),
        RetryPolicy::new(3, Duration::from_millis(500))
    );

    let config = settings.session_config().unwrap();
    assert_eq!(config.target, HostTarget::Name("time.example.com".into()));
    assert_eq!(config.remote_port, 9999);
    assert_eq!(config.reply_timeout, Duration::from_millis(1500));
}

#[test]
fn test_empty_host_name_uses_address() {
    let settings = ClientSettings::from_toml_str(
        r#"
        [endpoint]
        host_name = ""
        host_address = "10.0.0.1"
        port = 7
        "#,
    )
    .unwrap();

    let config = settings.session_config().unwrap();
    assert_eq!(config.target, HostTarget::Literal("10.0.0.1".into()));
}

#[test]
fn test_invalid_toml() {
    let result = ClientSettings::from_toml_str("debug = ");
    assert!(matches!(result, Err(NetworkError::Config(_))));

    let result = ClientSettings::from_toml_str("unknown_key = 1");
    assert!(matches!(result, Err(NetworkError::Config(_))));

    let result = ClientSettings::from_toml_str("[dns]\nservers = [\"not-an-ip\"]\n");
    assert!(matches!(result, Err(NetworkError::Config(_))));
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();

    let settings = ClientSettings::from_file(file.path()).unwrap();
    assert_eq!(settings.dns.max_retries, 3);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = ClientSettings::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(NetworkError::Io(_))));
}
