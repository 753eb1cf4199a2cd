//! Liveness handlers.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Plain-text liveness string served at `/`.
pub const LIVENESS_MESSAGE: &str = "🎉 Birthday Video Generator is Live!";

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub async fn index() -> &'static str {
    LIVENESS_MESSAGE
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
