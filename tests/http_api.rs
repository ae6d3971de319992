mod common;
use crate::common::{init_tracing, wait_until, ExecutionSettingsBuilder};

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt as _;
use serde_json::{json, Value};
use tower::ServiceExt; // for Router::oneshot

use cmdstream::exec::ExecutionController;
use cmdstream::http::{build_router, AppState, EXECUTION_ID_HEADER};
use cmdstream::store::SqliteStore;

fn test_app() -> Router {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let controller = ExecutionController::new(store, ExecutionSettingsBuilder::new().build());
    build_router(AppState::new(controller))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = send(app, "GET", uri, None).await;
    let v = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, v)
}

async fn find_with_status(app: &Router, status: &str) -> Option<Value> {
    let (_, v) = get_json(app, "/commands").await;
    let records = v.as_array()?;
    records.iter().find(|r| r["status"] == status).cloned()
}

#[tokio::test]
async fn post_returns_created_with_empty_body_and_execution_id() {
    init_tracing();
    let app = test_app();

    let req = Request::builder()
        .method("POST")
        .uri("/commands")
        .header("content-type", "application/json")
        .body(Body::from(json!({"command": "echo hello"}).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let execution_id = resp
        .headers()
        .get(EXECUTION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    assert!(execution_id.is_some());
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());

    let record = wait_until(Duration::from_secs(5), || {
        let app = app.clone();
        async move { find_with_status(&app, "succeeded").await }
    })
    .await
    .expect("command completes");
    assert_eq!(record["command"], "echo hello");
    assert_eq!(record["result"], "hello\n");
}

#[tokio::test]
async fn sleep_then_echo_scenario() {
    init_tracing();
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/commands",
        Some(json!({"command": "sleep 1 && echo done"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Immediately afterwards the record is absent or still running.
    let (status, v) = get_json(&app, "/commands").await;
    assert_eq!(status, StatusCode::OK);
    let records = v.as_array().expect("array");
    assert!(records.iter().all(|r| r["status"] == "running"));

    let record = wait_until(Duration::from_secs(5), || {
        let app = app.clone();
        async move { find_with_status(&app, "succeeded").await }
    })
    .await
    .expect("command completes");
    assert_eq!(record["result"], "done\n");

    let id = record["id"].as_i64().unwrap();
    let (status, v) = get_json(&app, &format!("/commands/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["command"], "sleep 1 && echo done");
    assert_eq!(v["result"], "done\n");
    assert_eq!(v["exit_code"], 0);
}

#[tokio::test]
async fn list_is_empty_array_initially() {
    let app = test_app();
    let (status, v) = get_json(&app, "/commands").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!([]));
}

#[tokio::test]
async fn unknown_id_is_server_error_with_text() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/commands/4242", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("not found"), "body was {text:?}");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = test_app();

    let req = Request::builder()
        .method("POST")
        .uri("/commands")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/commands", Some(json!({"cmd": "ls"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, v) = get_json(&app, "/commands").await;
    assert_eq!(v, json!([]), "rejected requests never start anything");
}

#[tokio::test]
async fn json_body_is_accepted_without_json_content_type() {
    init_tracing();
    let app = test_app();

    // What `curl -d '{...}'` sends by default.
    let req = Request::builder()
        .method("POST")
        .uri("/commands")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(json!({"command": "echo hi"}).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = Request::builder()
        .method("POST")
        .uri("/commands")
        .body(Body::from(json!({"command": "echo bare"}).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let records = wait_until(Duration::from_secs(5), || {
        let app = app.clone();
        async move {
            let (_, v) = get_json(&app, "/commands").await;
            let records = v.as_array()?.clone();
            (records.len() == 2 && records.iter().all(|r| r["status"] == "succeeded"))
                .then_some(records)
        }
    })
    .await
    .expect("both commands complete");
    let mut results: Vec<&str> = records.iter().filter_map(|r| r["result"].as_str()).collect();
    results.sort();
    assert_eq!(results, vec!["bare\n", "hi\n"]);
}

#[tokio::test]
async fn stop_succeeds_once_then_reports_already_stopped() {
    init_tracing();
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/commands",
        Some(json!({"command": "printf ready; exec sleep 30"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let running = wait_until(Duration::from_secs(5), || {
        let app = app.clone();
        async move { find_with_status(&app, "running").await }
    })
    .await
    .expect("partial output is visible while running");
    assert_eq!(running["result"], "ready");

    let (status, _) = send(&app, "POST", "/commands/stop", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/commands/stop", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(body).unwrap(), "Command already stopped");

    let cancelled = wait_until(Duration::from_secs(5), || {
        let app = app.clone();
        async move { find_with_status(&app, "cancelled").await }
    })
    .await
    .expect("sleep is cancelled");
    assert_eq!(cancelled["id"], running["id"]);
    assert_eq!(cancelled["result"], "ready");
}

#[tokio::test]
async fn executions_can_be_listed_and_stopped_individually() {
    init_tracing();
    let app = test_app();

    let req = Request::builder()
        .method("POST")
        .uri("/commands")
        .header("content-type", "application/json")
        .body(Body::from(json!({"command": "sleep 30"}).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let id: u64 = resp.headers()[EXECUTION_ID_HEADER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let (status, v) = get_json(&app, "/executions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!([{"execution_id": id, "command": "sleep 30"}]));

    let (status, _) = send(&app, "POST", &format!("/executions/{id}/stop"), None).await;
    assert_eq!(status, StatusCode::OK);

    let gone = wait_until(Duration::from_secs(5), || {
        let app = app.clone();
        async move {
            let (_, v) = get_json(&app, "/executions").await;
            let active = v.as_array()?;
            active.is_empty().then_some(())
        }
    })
    .await;
    assert!(gone.is_some(), "execution leaves the active list");

    let (status, _) = send(&app, "POST", &format!("/executions/{id}/stop"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_app();
    let (status, v) = get_json(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({"ok": true}));
}
