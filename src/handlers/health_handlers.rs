//! Liveness and diagnostic handlers.
//!
//! - GET /        -> service name and version
//! - GET /health  -> configured region, bucket and storage backend
//!
//! Neither endpoint performs I/O.

use crate::routes::routes::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

const SERVICE_NAME: &str = "Weather Explorer API";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    aws_region: String,
    s3_bucket: String,
    storage_backend: &'static str,
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        aws_region: state.deployment.region.clone(),
        s3_bucket: state.deployment.bucket.clone(),
        storage_backend: state.weather.storage_backend(),
    })
}
