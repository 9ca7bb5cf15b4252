//! Handler for the internal statistics endpoint.

use axum::{Json, extract::State};

use crate::api::dto::stats::StatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the number of live URLs and of users owning them.
///
/// # Endpoint
///
/// `GET /api/internal/stats`
///
/// Guarded by [`crate::api::middleware::trusted_subnet`].
///
/// # Response
///
/// ```json
/// { "urls": 42, "users": 7 }
/// ```
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.url_service.get_stats().await?;
    Ok(Json(stats.into()))
}
