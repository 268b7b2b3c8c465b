//! Axum router and shared application state (§6, §10 "HTTP admin middleware").
//!
//! Grounded on `global-controller::routes::build_routes()`'s
//! `AppState`/`TraceLayer`/`TimeoutLayer` shape, with no auth layer: §1
//! keeps authentication out of scope for this surface, a conscious
//! omission rather an oversight.

use crate::handlers;
use axum::routing::{get, post};
use axum::Router;
use broker::{BrokerClient, StatusLedger};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across every handler.
#[derive(Clone)]
pub struct AppState {
    pub broker: BrokerClient,
    pub ledger: StatusLedger,
}

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/servers", get(handlers::servers::list).post(handlers::servers::create))
        .route(
            "/api/v1/servers/:id",
            get(handlers::servers::get)
                .put(handlers::servers::update)
                .delete(handlers::servers::delete),
        )
        .route("/api/v1/meetings", get(handlers::meetings::list).post(handlers::meetings::create))
        .route(
            "/api/v1/meetings/:id",
            get(handlers::meetings::get)
                .put(handlers::meetings::update)
                .delete(handlers::meetings::delete),
        )
        .route(
            "/api/v1/meetings/:id/status",
            get(handlers::status::get_all).delete(handlers::status::delete_all),
        )
        .route(
            "/api/v1/meetings/:id/status/:field",
            get(handlers::status::get_field)
                .put(handlers::status::put_field)
                .delete(handlers::status::delete_field),
        )
        .route("/api/v1/commands", post(handlers::commands::create))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
