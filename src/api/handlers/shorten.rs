//! Handlers for the shortening endpoints.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::{
    BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse,
};
use crate::application::services::{BatchEntry, ShortenOutcome, UserIdentity};
use crate::error::AppError;
use crate::state::AppState;

fn outcome_status(outcome: &ShortenOutcome) -> StatusCode {
    if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

/// Shortens a URL sent as the raw request body.
///
/// # Endpoint
///
/// `POST /`
///
/// # Response Codes
///
/// - **201 Created**: body is the new short URL
/// - **409 Conflict**: URL already shortened; body is the existing short URL
/// - **400 Bad Request**: body is empty or not an HTTP(S) URL
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    body: String,
) -> Result<Response, AppError> {
    let outcome = state
        .url_service
        .create_url_record(&body, &identity.user_id)
        .await?;

    let short_url = state.url_service.short_url(&outcome.record().short);

    Ok((outcome_status(&outcome), short_url).into_response())
}

/// Shortens a URL sent as JSON.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://practicum.yandex.ru/" }
/// ```
///
/// # Response
///
/// ```json
/// { "result": "http://localhost:8080/5Ol0CyIn" }
/// ```
///
/// Returned with **201 Created**, or **409 Conflict** when the URL was
/// already shortened.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let outcome = state
        .url_service
        .create_url_record(&payload.url, &identity.user_id)
        .await?;

    let result = state.url_service.short_url(&outcome.record().short);

    Ok((outcome_status(&outcome), Json(ShortenResponse { result })).into_response())
}

/// Shortens several URLs in one request.
///
/// # Endpoint
///
/// `POST /api/shorten/batch`
///
/// # Request Body
///
/// ```json
/// [
///   { "correlation_id": "1", "original_url": "https://practicum.yandex.ru/" }
/// ]
/// ```
///
/// # Response
///
/// ```json
/// [
///   { "correlation_id": "1", "short_url": "http://localhost:8080/5Ol0CyIn" }
/// ]
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if any entry is invalid and 409 Conflict if any
/// URL was already shortened (nothing is stored in either case).
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(payload): Json<Vec<BatchRequestItem>>,
) -> Result<(StatusCode, Json<Vec<BatchResponseItem>>), AppError> {
    if payload.is_empty() {
        return Err(AppError::bad_request("Batch must not be empty", json!({})));
    }
    for item in &payload {
        item.validate()?;
    }

    let entries: Vec<BatchEntry> = payload.into_iter().map(Into::into).collect();
    let records = state
        .url_service
        .create_url_records(entries, &identity.user_id)
        .await?;

    let items = records
        .into_iter()
        .map(|r| BatchResponseItem {
            short_url: state.url_service.short_url(&r.short),
            correlation_id: r.id,
        })
        .collect();

    Ok((StatusCode::CREATED, Json(items)))
}
