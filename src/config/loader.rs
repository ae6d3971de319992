// src/config/loader.rs

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CmdstreamError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Like [`load_from_path`], but a missing file yields the built-in defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(RawConfigFile::default());
    }
    load_from_path(path)
}

/// Load config (or defaults), apply `CMDSTREAM_*` environment overrides and
/// validate the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw = load_or_default(path)?;
    apply_env_overrides(&mut raw, |key| std::env::var(key).ok())?;
    ConfigFile::try_from(raw)
}

/// Load a dotenv file into the process environment.
///
/// Variables that are already set are left untouched. Returns `false` when
/// the file does not exist.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path(path).map_err(|e| {
        CmdstreamError::ConfigError(format!("loading env file {}: {e}", path.display()))
    })?;
    Ok(true)
}

/// Overlay `CMDSTREAM_*` variables onto a raw config.
///
/// `lookup` abstracts the environment so tests don't have to mutate the
/// process-wide one.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CMDSTREAM_LISTEN") {
        raw.server.listen = v;
    }
    if let Some(v) = lookup("CMDSTREAM_DB_BACKEND") {
        raw.database.backend = parse_env("CMDSTREAM_DB_BACKEND", &v)?;
    }
    if let Some(v) = lookup("CMDSTREAM_DB_PATH") {
        raw.database.path = v;
    }
    if let Some(v) = lookup("CMDSTREAM_DB_BUSY_TIMEOUT_MS") {
        raw.database.busy_timeout_ms = parse_env("CMDSTREAM_DB_BUSY_TIMEOUT_MS", &v)?;
    }
    if let Some(v) = lookup("CMDSTREAM_SHELL") {
        raw.execution.shell = v;
    }
    if let Some(v) = lookup("CMDSTREAM_CHUNK_SIZE") {
        raw.execution.chunk_size = parse_env("CMDSTREAM_CHUNK_SIZE", &v)?;
    }
    if let Some(v) = lookup("CMDSTREAM_PERSIST_MODE") {
        raw.execution.persist_mode = parse_env("CMDSTREAM_PERSIST_MODE", &v)?;
    }
    if let Some(v) = lookup("CMDSTREAM_MAX_CONCURRENT") {
        raw.execution.max_concurrent = parse_env("CMDSTREAM_MAX_CONCURRENT", &v)?;
    }
    Ok(())
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CmdstreamError::ConfigError(format!("invalid {key}={value:?}: {e}")))
}
