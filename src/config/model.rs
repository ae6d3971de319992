// src/config/model.rs

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{PersistMode, StoreBackend};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// listen = "127.0.0.1:8085"
///
/// [database]
/// backend = "sqlite"
/// path = "cmdstream.db"
/// busy_timeout_ms = 5000
///
/// [execution]
/// shell = "bash"
/// chunk_size = 4096
/// persist_mode = "update"
/// max_concurrent = 0
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: RawServerSection,

    #[serde(default)]
    pub database: RawDatabaseSection,

    #[serde(default)]
    pub execution: RawExecutionSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawServerSection {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for RawServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabaseSection {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file path. Ignored by the `memory` backend.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// How long SQLite waits on a locked database file before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for RawDatabaseSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecutionSection {
    /// Shell used as `<shell> -c <command>`.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Maximum number of bytes read from stdout per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub persist_mode: PersistMode,

    /// Upper bound on concurrently running processes. `0` means unbounded.
    #[serde(default)]
    pub max_concurrent: usize,
}

impl Default for RawExecutionSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            chunk_size: default_chunk_size(),
            persist_mode: PersistMode::default(),
            max_concurrent: 0,
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8085".to_string()
}

fn default_database_path() -> String {
    "cmdstream.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_chunk_size() -> usize {
    4096
}

/// Validated configuration.
///
/// Only constructed via `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub execution: ExecutionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub path: String,
    pub busy_timeout: Duration,
}

/// Knobs consumed by the execution controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    pub shell: String,
    pub chunk_size: usize,
    pub persist_mode: PersistMode,
    pub max_concurrent: usize,
}

impl ExecutionSettings {
    /// `None` when executions are unbounded.
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent > 0).then_some(self.max_concurrent)
    }
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        let raw = RawExecutionSection::default();
        Self {
            shell: raw.shell,
            chunk_size: raw.chunk_size,
            persist_mode: raw.persist_mode,
            max_concurrent: raw.max_concurrent,
        }
    }
}
