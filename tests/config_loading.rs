use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use cmdstream::cli::{CliArgs, LogLevel};
use cmdstream::config::validate::MAX_CHUNK_SIZE;
use cmdstream::config::{
    apply_env_overrides, load_and_validate, load_env_file, load_from_path, load_or_default,
    ConfigFile, RawConfigFile,
};
use cmdstream::errors::CmdstreamError;
use cmdstream::logging::resolve_level;
use cmdstream::resolve_config;
use cmdstream::types::{PersistMode, StoreBackend};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn defaults_when_file_is_missing() {
    let raw = load_or_default("/definitely/not/here/Cmdstream.toml").unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();

    assert_eq!(cfg.server.listen.to_string(), "127.0.0.1:8085");
    assert_eq!(cfg.database.backend, StoreBackend::Sqlite);
    assert_eq!(cfg.database.path, "cmdstream.db");
    assert_eq!(cfg.database.busy_timeout, Duration::from_millis(5000));
    assert_eq!(cfg.execution.shell, "bash");
    assert_eq!(cfg.execution.chunk_size, 4096);
    assert_eq!(cfg.execution.persist_mode, PersistMode::Update);
    assert_eq!(cfg.execution.concurrency_limit(), None);
}

#[test]
fn parses_all_sections() {
    let file = write_config(
        r#"
[server]
listen = "0.0.0.0:9000"

[database]
backend = "memory"
busy_timeout_ms = 750

[execution]
shell = "sh"
chunk_size = 512
persist_mode = "snapshot"
max_concurrent = 4
"#,
    );

    let raw = load_from_path(file.path()).unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();
    assert_eq!(cfg.server.listen.port(), 9000);
    assert_eq!(cfg.database.backend, StoreBackend::Memory);
    assert_eq!(cfg.database.busy_timeout, Duration::from_millis(750));
    assert_eq!(cfg.execution.shell, "sh");
    assert_eq!(cfg.execution.chunk_size, 512);
    assert_eq!(cfg.execution.persist_mode, PersistMode::Snapshot);
    assert_eq!(cfg.execution.concurrency_limit(), Some(4));
}

#[test]
fn invalid_persist_mode_is_toml_error() {
    let file = write_config(
        r#"
[execution]
persist_mode = "append"
"#,
    );

    match load_from_path(file.path()) {
        Err(CmdstreamError::TomlError(_)) => {}
        other => panic!("Expected TomlError, got: {:?}", other),
    }
}

#[test]
fn zero_chunk_size_is_config_error() {
    let file = write_config(
        r#"
[execution]
chunk_size = 0
"#,
    );

    match load_and_validate(file.path()) {
        Err(CmdstreamError::ConfigError(msg)) => assert!(msg.contains("chunk_size")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn oversized_chunk_size_is_config_error() {
    let mut raw = RawConfigFile::default();
    raw.execution.chunk_size = MAX_CHUNK_SIZE + 1;

    match ConfigFile::try_from(raw) {
        Err(CmdstreamError::ConfigError(msg)) => assert!(msg.contains("chunk_size")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }

    let mut raw = RawConfigFile::default();
    raw.execution.chunk_size = MAX_CHUNK_SIZE;
    assert!(ConfigFile::try_from(raw).is_ok());
}

#[test]
fn oversized_max_concurrent_is_config_error() {
    let mut raw = RawConfigFile::default();
    raw.execution.max_concurrent = usize::MAX;

    match ConfigFile::try_from(raw) {
        Err(CmdstreamError::ConfigError(msg)) => assert!(msg.contains("max_concurrent")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn bad_listen_address_is_config_error() {
    let mut raw = RawConfigFile::default();
    raw.server.listen = "not-an-address".to_string();

    match ConfigFile::try_from(raw) {
        Err(CmdstreamError::ConfigError(msg)) => assert!(msg.contains("server.listen")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn empty_shell_is_config_error() {
    let mut raw = RawConfigFile::default();
    raw.execution.shell = "  ".to_string();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(CmdstreamError::ConfigError(_))
    ));
}

#[test]
fn env_overrides_win_over_file_values() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("CMDSTREAM_LISTEN", "127.0.0.1:7000"),
        ("CMDSTREAM_DB_BACKEND", "memory"),
        ("CMDSTREAM_DB_PATH", "/tmp/other.db"),
        ("CMDSTREAM_DB_BUSY_TIMEOUT_MS", "1500"),
        ("CMDSTREAM_SHELL", "sh"),
        ("CMDSTREAM_CHUNK_SIZE", "128"),
        ("CMDSTREAM_PERSIST_MODE", "snapshot"),
        ("CMDSTREAM_MAX_CONCURRENT", "2"),
    ]);

    let mut raw = RawConfigFile::default();
    apply_env_overrides(&mut raw, |key| env.get(key).map(|v| v.to_string())).unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();

    assert_eq!(cfg.server.listen.port(), 7000);
    assert_eq!(cfg.database.backend, StoreBackend::Memory);
    assert_eq!(cfg.database.path, "/tmp/other.db");
    assert_eq!(cfg.database.busy_timeout, Duration::from_millis(1500));
    assert_eq!(cfg.execution.shell, "sh");
    assert_eq!(cfg.execution.chunk_size, 128);
    assert_eq!(cfg.execution.persist_mode, PersistMode::Snapshot);
    assert_eq!(cfg.execution.max_concurrent, 2);
}

#[test]
fn unparsable_env_value_is_config_error() {
    let mut raw = RawConfigFile::default();
    let result = apply_env_overrides(&mut raw, |key| {
        (key == "CMDSTREAM_CHUNK_SIZE").then(|| "lots".to_string())
    });

    match result {
        Err(CmdstreamError::ConfigError(msg)) => assert!(msg.contains("CMDSTREAM_CHUNK_SIZE")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn missing_env_file_is_not_an_error() {
    assert!(!load_env_file("/definitely/not/here/.env").unwrap());
}

#[test]
fn cli_flags_override_config_file() {
    let file = write_config(
        r#"
[server]
listen = "127.0.0.1:9000"

[database]
path = "from-file.db"
"#,
    );

    let args = CliArgs {
        config: file.path().to_path_buf(),
        env_file: PathBuf::from("/definitely/not/here/.env"),
        listen: Some("127.0.0.1:9100".to_string()),
        database: Some(":memory:".to_string()),
        log_level: None,
    };

    let cfg = resolve_config(&args).unwrap();
    assert_eq!(cfg.server.listen.port(), 9100);
    assert_eq!(cfg.database.path, ":memory:");
}

#[test]
fn log_level_prefers_cli_then_env() {
    assert_eq!(
        resolve_level(Some(LogLevel::Debug), Some("error")),
        tracing::Level::DEBUG
    );
    assert_eq!(resolve_level(None, Some("warning")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("bogus")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}
