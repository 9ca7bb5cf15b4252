//! API route configuration.

use crate::api::handlers::{
    delete_user_urls_handler, list_user_urls_handler, shorten_batch_handler,
    shorten_json_handler, stats_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes acting on behalf of a user, nested under `/api`.
///
/// Expects [`crate::api::middleware::identity`] to run first.
///
/// # Endpoints
///
/// - `POST   /shorten`        - Shorten one URL (JSON)
/// - `POST   /shorten/batch`  - Shorten several URLs with correlation ids
/// - `GET    /user/urls`      - List the caller's URLs
/// - `DELETE /user/urls`      - Queue deletion of the caller's URLs
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_json_handler))
        .route("/shorten/batch", post(shorten_batch_handler))
        .route(
            "/user/urls",
            get(list_user_urls_handler).delete(delete_user_urls_handler),
        )
}

/// Operator routes, nested under `/api/internal`.
///
/// Expects [`crate::api::middleware::trusted_subnet`] to run first.
///
/// # Endpoints
///
/// - `GET /stats` - Live URL and user counts
pub fn internal_routes() -> Router<AppState> {
    Router::new().route("/stats", get(stats_handler))
}
