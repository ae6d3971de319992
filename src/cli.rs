// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdstream`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdstream",
    version,
    about = "Run shell commands over HTTP and stream their output into a record store.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file is not an error: built-in defaults plus environment
    /// overrides are used instead.
    #[arg(long, value_name = "PATH", default_value = "Cmdstream.toml")]
    pub config: PathBuf,

    /// Dotenv file loaded before the config (existing variables win).
    #[arg(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Address to listen on, e.g. `0.0.0.0:8085`.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// SQLite database path (`:memory:` for a throwaway database).
    #[arg(long, value_name = "PATH")]
    pub database: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDSTREAM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
