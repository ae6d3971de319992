// src/http/handlers.rs

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{AppState, EXECUTION_ID_HEADER};
use crate::errors::CmdstreamError;
use crate::types::ExecutionId;

/// Body of `POST /commands`.
#[derive(Debug, Deserialize)]
pub struct SubmitCommand {
    pub command: String,
}

fn error_response(status: StatusCode, err: impl ToString) -> Response {
    (status, err.to_string()).into_response()
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

/// Accept a command and run it in the background.
///
/// The body is parsed as JSON whatever the `Content-Type` header says.
/// 201 means "accepted for processing", not "succeeded": spawn failures
/// after this point only show up in the logs.
pub async fn create_command(State(state): State<AppState>, body: Bytes) -> Response {
    let req: SubmitCommand = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "rejecting malformed command request");
            return error_response(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"));
        }
    };

    let handle = state.controller.execute(req.command);
    (
        StatusCode::CREATED,
        [(EXECUTION_ID_HEADER, handle.id().to_string())],
    )
        .into_response()
}

pub async fn list_commands(State(state): State<AppState>) -> Response {
    match state.store.list_all().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Not-found and storage failures both map to 500 with the error text.
pub async fn get_command(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.get_by_id(id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

pub async fn stop_all(State(state): State<AppState>) -> Response {
    match state.controller.stop_all() {
        Ok(cancelled) => {
            info!(cancelled, "stop requested over HTTP");
            StatusCode::OK.into_response()
        }
        Err(e @ CmdstreamError::AlreadyStopped) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

pub async fn list_executions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.active_executions())
}

pub async fn stop_execution(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    match state.controller.stop(ExecutionId(id)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e @ CmdstreamError::NotRunning(_)) => error_response(StatusCode::NOT_FOUND, e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
