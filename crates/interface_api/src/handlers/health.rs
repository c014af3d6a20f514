//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use core_kernel::AdapterHealth;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: None,
    })
}

/// Readiness check (includes the snapshot store)
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let health = state.reader.health_check().await;
    let body = HealthResponse {
        status: match health.status {
            AdapterHealth::Healthy => "ready",
            AdapterHealth::Degraded => "degraded",
            AdapterHealth::Unhealthy => "unavailable",
        }
        .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: health.message,
    };

    match health.status {
        AdapterHealth::Unhealthy => Err((StatusCode::SERVICE_UNAVAILABLE, Json(body))),
        _ => Ok(Json(body)),
    }
}
