//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use utoipa::ToSchema;

use super::state::AppState;
use super::types::{ApiResponse, error_codes};

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// Build revision
    #[schema(example = "a1b2c3d")]
    pub version: &'static str,
}

/// Health check endpoint
///
/// Pings the identity store. Failure details are logged, not returned.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, version}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: Utc::now().timestamp_millis(),
                version: env!("GIT_HASH"),
            })),
        ),
        Err(e) => {
            tracing::error!("[HEALTH] Identity store ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    code: error_codes::SERVICE_UNAVAILABLE,
                    msg: "unavailable".to_string(),
                    data: None,
                }),
            )
        }
    }
}
