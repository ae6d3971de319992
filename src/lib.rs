// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod http;
pub mod logging;
pub mod store;
pub mod types;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{apply_env_overrides, load_or_default, ConfigFile, RawConfigFile};
use crate::exec::ExecutionController;
use crate::http::{build_router, AppState};
use crate::store::open_store;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, environment, CLI overrides)
/// - the record store
/// - the execution controller
/// - the HTTP server
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;
    info!(
        listen = %cfg.server.listen,
        backend = ?cfg.database.backend,
        database = %cfg.database.path,
        persist_mode = ?cfg.execution.persist_mode,
        max_concurrent = cfg.execution.max_concurrent,
        "starting cmdstream"
    );

    let store = open_store(&cfg.database)
        .with_context(|| format!("opening record store at {:?}", cfg.database.path))?;
    let controller = ExecutionController::new(store, cfg.execution.clone());
    let app = build_router(AppState::new(controller.clone()));

    let listener = TcpListener::bind(cfg.server.listen)
        .await
        .with_context(|| format!("binding {}", cfg.server.listen))?;
    info!(addr = %cfg.server.listen, "cmdstream listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    let cancelled = controller.cancel_all();
    if cancelled > 0 {
        warn!(cancelled, "cancelled in-flight executions on shutdown");
    }
    info!("cmdstream stopped");
    Ok(())
}

/// Merge config file, `CMDSTREAM_*` environment and CLI flags (highest
/// priority) into a validated config.
pub fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = load_or_default(&args.config)
        .with_context(|| format!("loading config file {:?}", args.config))?;
    apply_env_overrides(&mut raw, |key| std::env::var(key).ok())?;
    apply_cli_overrides(&mut raw, args);
    Ok(ConfigFile::try_from(raw)?)
}

fn apply_cli_overrides(raw: &mut RawConfigFile, args: &CliArgs) {
    if let Some(ref listen) = args.listen {
        raw.server.listen = listen.clone();
    }
    if let Some(ref database) = args.database {
        raw.database.path = database.clone();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
