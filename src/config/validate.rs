// src/config/validate.rs

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::model::{
    ConfigFile, DatabaseConfig, ExecutionSettings, RawConfigFile, ServerConfig,
};
use crate::errors::{CmdstreamError, Result};
use crate::types::StoreBackend;

/// Upper bound for `execution.chunk_size`; each execution holds one read
/// buffer of this size.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CmdstreamError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let listen = parse_listen(&raw.server.listen)?;
        validate_database(&raw)?;
        validate_execution(&raw)?;

        Ok(ConfigFile {
            server: ServerConfig { listen },
            database: DatabaseConfig {
                backend: raw.database.backend,
                path: raw.database.path,
                busy_timeout: Duration::from_millis(raw.database.busy_timeout_ms),
            },
            execution: ExecutionSettings {
                shell: raw.execution.shell,
                chunk_size: raw.execution.chunk_size,
                persist_mode: raw.execution.persist_mode,
                max_concurrent: raw.execution.max_concurrent,
            },
        })
    }
}

fn parse_listen(listen: &str) -> Result<SocketAddr> {
    listen.trim().parse().map_err(|e| {
        CmdstreamError::ConfigError(format!("invalid server.listen address {listen:?}: {e}"))
    })
}

fn validate_database(cfg: &RawConfigFile) -> Result<()> {
    if cfg.database.backend == StoreBackend::Sqlite && cfg.database.path.trim().is_empty() {
        return Err(CmdstreamError::ConfigError(
            "database.path must not be empty for the sqlite backend".to_string(),
        ));
    }
    Ok(())
}

fn validate_execution(cfg: &RawConfigFile) -> Result<()> {
    if cfg.execution.shell.trim().is_empty() {
        return Err(CmdstreamError::ConfigError(
            "execution.shell must not be empty".to_string(),
        ));
    }

    if cfg.execution.chunk_size == 0 || cfg.execution.chunk_size > MAX_CHUNK_SIZE {
        return Err(CmdstreamError::ConfigError(format!(
            "execution.chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
            cfg.execution.chunk_size
        )));
    }

    if cfg.execution.max_concurrent > Semaphore::MAX_PERMITS {
        return Err(CmdstreamError::ConfigError(format!(
            "execution.max_concurrent must be at most {}, got {}",
            Semaphore::MAX_PERMITS,
            cfg.execution.max_concurrent
        )));
    }

    Ok(())
}
