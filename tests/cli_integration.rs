//! CLI integration tests.
//!
//! These tests verify the CLI argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use tempfile::NamedTempFile;

use header_session::cli::{parse_args_from, Args};
use header_session::config::{Config, ConfigError};

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("header-session")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&[])).unwrap();

    assert!(result.host.is_none());
    assert!(result.port.is_none());
    assert!(result.config.is_none());
    assert!(result.redis_url.is_none());
    assert!(!result.admin);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-H",
        "0.0.0.0",
        "-p",
        "8080",
        "-r",
        "redis://cache:6379/1",
        "-t",
        "3600",
        "-l",
        "debug",
        "--persist",
        "--admin",
    ]))
    .unwrap();

    assert_eq!(result.host, Some("0.0.0.0".parse().unwrap()));
    assert_eq!(result.port, Some(8080));
    assert_eq!(result.redis_url.as_deref(), Some("redis://cache:6379/1"));
    assert_eq!(result.ttl, Some(3600));
    assert_eq!(result.log_level.as_deref(), Some("debug"));
    assert!(result.persist);
    assert!(result.admin);
    assert!(!result.debug);
}

#[test]
fn test_cli_config_file() {
    let result = parse_args_from(args(&["-c", "/etc/header-session.json"])).unwrap();

    assert_eq!(
        result.config.unwrap().to_str().unwrap(),
        "/etc/header-session.json"
    );
}

#[test]
fn test_cli_invalid_values() {
    assert!(parse_args_from(args(&["-p", "not-a-number"])).is_err());
    assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
    assert!(parse_args_from(args(&["-t", "soon"])).is_err());
    assert!(parse_args_from(args(&["--unknown"])).is_err());
}

// ============================================================================
// Configuration Loading Tests
// ============================================================================

#[test]
fn test_config_from_json_file() {
    let file = config_file(
        r#"{
        "server": {
            "host": "192.168.1.100",
            "port": 9000,
            "graceful_shutdown": false
        },
        "session": {
            "ttl_secs": 120,
            "debug": true,
            "admin_operations": true,
            "sid_length": 32,
            "key_prefix": "app:sess:",
            "connection": {
                "host": "10.0.0.9",
                "username": "svc",
                "password": "pw"
            }
        },
        "logging": {
            "level": "debug"
        }
    }"#,
    );

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "192.168.1.100");
    assert_eq!(config.server.port, 9000);
    assert!(!config.server.graceful_shutdown);
    assert_eq!(config.session.ttl_secs, 120);
    assert!(config.session.debug);
    assert!(config.session.admin_operations);
    assert_eq!(config.session.sid_length, 32);
    assert_eq!(config.session.key_prefix, "app:sess:");
    assert_eq!(
        config.session.connection.to_url(),
        "redis://svc:pw@10.0.0.9:6379"
    );
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_config_priority_cli_over_file() {
    let file = config_file(
        r#"{
        "server": { "host": "10.0.0.1", "port": 5000 },
        "session": { "ttl_secs": 60, "persist": false }
    }"#,
    );

    let args = Args {
        host: Some("192.168.1.1".parse().unwrap()),
        port: Some(8080),
        config: Some(file.path().to_path_buf()),
        ttl: Some(900),
        persist: true,
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();

    assert_eq!(config.server.host, "192.168.1.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.session.ttl_secs, 900);
    assert!(config.session.persist);
}

#[test]
fn test_config_file_server_used_without_cli_flags() {
    let file = config_file(r#"{ "server": { "host": "0.0.0.0", "port": 9100 } }"#);

    let args = parse_args_from(args(&["-c", file.path().to_str().unwrap()])).unwrap();
    let config = Config::load(&args).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9100);
}

#[test]
fn test_config_load_rejects_oversized_ttl() {
    let args = Args {
        ttl: Some(u64::MAX),
        ..Args::default()
    };

    assert!(matches!(
        Config::load(&args),
        Err(ConfigError::InvalidValue("ttl_secs", _))
    ));
}

#[test]
fn test_config_load_rejects_invalid_session() {
    let file = config_file(r#"{ "session": { "sid_header": "two words" } }"#);

    let args = Args {
        config: Some(file.path().to_path_buf()),
        ..Args::default()
    };

    assert!(matches!(
        Config::load(&args),
        Err(ConfigError::InvalidHeader(_))
    ));
}

#[test]
fn test_config_missing_file() {
    let args = Args {
        config: Some("/nonexistent/header-session.json".into()),
        ..Args::default()
    };

    assert!(matches!(Config::load(&args), Err(ConfigError::Io(_))));
}

#[test]
fn test_config_to_server_config() {
    let args = Args {
        host: Some("0.0.0.0".parse().unwrap()),
        port: Some(8080),
        ..Args::default()
    };

    let config = Config::load(&args).unwrap();
    let server_config = config.to_server_config().unwrap();

    assert_eq!(server_config.host, "0.0.0.0");
    assert_eq!(server_config.port, 8080);
}

// ============================================================================
// Configuration Serialization Tests
// ============================================================================

#[test]
fn test_config_roundtrip() {
    let original = Config::default();
    let json = serde_json::to_string(&original).unwrap();
    let loaded: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(original.server.host, loaded.server.host);
    assert_eq!(original.server.port, loaded.server.port);
    assert_eq!(original.session, loaded.session);
}

#[test]
fn test_config_partial_deserialization() {
    let json = r#"{"session": {"persist": true}}"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert!(config.session.persist);
    assert_eq!(config.session.ttl_secs, 600);
    assert_eq!(config.session.sid_header, "Session-Id");
    assert!(config.server.graceful_shutdown);
}
