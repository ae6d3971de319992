// src/http/mod.rs

//! HTTP surface: maps verbs and paths onto the execution controller and the
//! record store.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::exec::ExecutionController;
use crate::store::RecordStore;

/// Response header carrying the id of an accepted execution.
pub const EXECUTION_ID_HEADER: &str = "x-execution-id";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub controller: ExecutionController,
}

impl AppState {
    pub fn new(controller: ExecutionController) -> Self {
        Self {
            store: Arc::clone(controller.store()),
            controller,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/commands",
            post(handlers::create_command).get(handlers::list_commands),
        )
        .route("/commands/stop", post(handlers::stop_all))
        .route("/commands/{id}", get(handlers::get_command))
        .route("/executions", get(handlers::list_executions))
        .route("/executions/{id}/stop", post(handlers::stop_execution))
        .with_state(state)
}
