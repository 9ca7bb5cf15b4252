//! Handlers for liveness endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Checks that storage is reachable.
///
/// # Endpoint
///
/// `GET /ping`
///
/// # Response Codes
///
/// - **200 OK**: storage answered in time
/// - **500 Internal Server Error**: storage failed or timed out
pub async fn ping_handler(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.url_service.ping().await?;
    Ok(StatusCode::OK)
}

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "storage": { "status": "ok", "message": "Reachable" },
///     "delete_worker": { "status": "ok", "message": "Accepting requests" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = match state.url_service.ping().await {
        Ok(()) => CheckStatus::ok("Reachable"),
        Err(e) => CheckStatus::error(format!("Storage error: {e}")),
    };

    let delete_worker = if state.url_service.delete_worker_running() {
        CheckStatus::ok("Accepting requests")
    } else {
        CheckStatus::error("Delete worker is stopped")
    };

    let all_healthy = storage.is_ok() && delete_worker.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage,
            delete_worker,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
