use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub health: &'static str,
}

/// GET /health
/// Liveness probe; exempt from rate limiting and authentication.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.store().ping().await.is_ok() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// GET /
pub async fn root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "skydock deployment platform API",
        version: env!("CARGO_PKG_VERSION"),
        health: "/health",
    })
}
