// src/config/mod.rs

//! Configuration loading and validation for cmdstream.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file and `.env` overrides (`loader.rs`).
//! - Validate the raw model into a `ConfigFile` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, load_and_validate, load_env_file, load_from_path, load_or_default};
pub use model::{
    ConfigFile, DatabaseConfig, ExecutionSettings, RawConfigFile, RawDatabaseSection,
    RawExecutionSection, RawServerSection, ServerConfig,
};
