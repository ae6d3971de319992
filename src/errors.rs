// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::ExecutionId;

#[derive(Error, Debug)]
pub enum CmdstreamError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] rusqlite::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Command not found: {0}")]
    NotFound(i64),

    #[error("Command already stopped")]
    AlreadyStopped,

    #[error("Execution not running: {0}")]
    NotRunning(ExecutionId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CmdstreamError>;
