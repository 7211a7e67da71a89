//! Observability HTTP Routes
//!
//! Liveness of the control surface itself and the failover counters.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::engine::Lighthouse;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create observability routes
pub fn observability_routes(engine: Arc<Lighthouse>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(engine)
}

/// Health check handler. Answers as long as the process serves requests.
async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(engine): State<Arc<Lighthouse>>) -> impl IntoResponse {
    (StatusCode::OK, Json(engine.metrics().snapshot()))
}
