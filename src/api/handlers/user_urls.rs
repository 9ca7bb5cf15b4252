//! Handlers for the caller's own URLs.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::user_urls::UserUrlItem;
use crate::application::services::UserIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Rejects identities minted for the current request: they own nothing.
fn require_known(identity: &UserIdentity) -> Result<&str, AppError> {
    if identity.is_new {
        return Err(AppError::unauthorized(
            "Unauthorized",
            json!({ "reason": "No user token presented" }),
        ));
    }
    Ok(&identity.user_id)
}

/// Lists the URLs the caller has shortened.
///
/// # Endpoint
///
/// `GET /api/user/urls`
///
/// # Response Codes
///
/// - **200 OK**: `[{"short_url", "original_url"}]`
/// - **204 No Content**: the caller owns no live URLs
/// - **401 Unauthorized**: no user token was presented
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Response, AppError> {
    let user_id = require_known(&identity)?;

    let records = state.url_service.get_urls_by_user(user_id).await?;
    if records.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let items: Vec<UserUrlItem> = records
        .into_iter()
        .map(|r| UserUrlItem {
            short_url: state.url_service.short_url(&r.short),
            original_url: r.original,
        })
        .collect();

    Ok(Json(items).into_response())
}

/// Queues deletion of the caller's URLs.
///
/// # Endpoint
///
/// `DELETE /api/user/urls`
///
/// # Request Body
///
/// ```json
/// ["5Ol0CyIn", "aO5UR9qN"]
/// ```
///
/// Answers **202 Accepted** immediately. The deletion worker marks the
/// records deleted later; codes the caller does not own are ignored.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(codes): Json<Vec<String>>,
) -> Result<StatusCode, AppError> {
    let user_id = require_known(&identity)?;

    state.url_service.delete_url_records(user_id, codes);

    Ok(StatusCode::ACCEPTED)
}
