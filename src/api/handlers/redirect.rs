//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Response Codes
///
/// - **307 Temporary Redirect**: `Location` is the original URL
/// - **404 Not Found**: unknown code
/// - **410 Gone**: the owner deleted the URL
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let record = state.url_service.get_url_by_short(&code).await?;
    debug!(%code, target = %record.original, "Redirecting");

    Ok(Redirect::temporary(&record.original))
}
