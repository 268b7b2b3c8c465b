//! Integration suite for the HTTP admin router, driven with
//! `tower::ServiceExt::oneshot` against the real router built by
//! [`http_admin::routes::build_routes`].
//!
//! Requires a live Redis instance at `REDIS_URL` (default
//! `redis://127.0.0.1:6380/1`); gated behind the `live` feature so a plain
//! `cargo test` never needs one, matching how `env-tests` gates its
//! cluster-dependent suites behind Cargo features.

#![cfg(feature = "live")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use broker::{BrokerClient, StatusLedger};
use http_admin::routes::{build_routes, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_state() -> Arc<AppState> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6380/1".to_string());
    let broker = BrokerClient::connect(&redis_url)
        .await
        .expect("connect to live redis for integration test");
    let ledger = StatusLedger::new(broker.clone(), 60);
    Arc::new(AppState { broker, ledger })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is valid JSON")
}

#[tokio::test]
async fn meeting_create_then_get_round_trips() {
    let state = test_state().await;
    let app = build_routes(state);

    let payload = json!({
        "id": "it-meeting-1",
        "meetingName": "Integration Test Standup",
        "server": "bbb",
        "owner": {"email": "  Alice@Example.COM  "},
    });

    let create = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/meetings")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let get = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/meetings/it-meeting-1")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(get).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let fetched = body_json(response).await;
    assert_eq!(fetched["owner"]["email"], "alice@example.com");

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri("/api/v1/meetings/it-meeting-1")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(delete).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn meeting_create_rejects_past_start_date() {
    let state = test_state().await;
    let app = build_routes(state);

    let payload = json!({
        "id": "it-meeting-past",
        "meetingName": "Integration Test Standup",
        "server": "bbb",
        "owner": {"email": "alice@example.com"},
        "startDate": "2000-01-01 10:00",
    });

    let create = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/meetings")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);

    let get = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/meetings/it-meeting-past")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn meeting_get_missing_is_not_found() {
    let state = test_state().await;
    let app = build_routes(state);

    let get = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/meetings/does-not-exist")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_field_round_trips_and_reports_history() {
    let state = test_state().await;
    let app = build_routes(state);

    let put = axum::http::Request::builder()
        .method("PUT")
        .uri("/api/v1/meetings/it-status-1/status/started")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({"status_code": "220", "status_message": "started"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(put).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let get = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/meetings/it-status-1/status/started")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(get).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let history = body_json(response).await;
    let entries = history.as_array().expect("history is an array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["code"], "220");

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri("/api/v1/meetings/it-status-1/status")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(delete).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn command_create_rejects_non_object_data() {
    let state = test_state().await;
    let app = build_routes(state);

    let post = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/commands")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({"command": "closeMeeting", "server": "bbb", "data": "not-an-object"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(post).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}
