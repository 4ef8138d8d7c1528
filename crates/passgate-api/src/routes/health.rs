//! Health check endpoint for load balancers and container probes.

use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::Passgate;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check router.
pub fn router() -> Router<Arc<Passgate>> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
