//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /`                    - Shorten a plain-text URL (identity)
//! - `/api/*`                    - JSON shortening and user URLs (identity)
//! - `GET  /api/internal/stats`  - Statistics (trusted subnet)
//! - `GET  /ping`                - Storage check (public)
//! - `GET  /health`              - Component health (public)
//! - `GET  /{code}`              - Short link redirect (public)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Identity** - Signed user token, issued on first contact
//! - **Trusted subnet** - `X-Real-IP` must fall inside `TRUSTED_SUBNET`
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, ping_handler, redirect_handler, shorten_text_handler};
use crate::api::middleware::{identity, tracing, trusted_subnet};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the router with all routes and middleware, without path
/// normalization.
pub fn router(state: AppState) -> Router {
    let identified = Router::new()
        .route("/", post(shorten_text_handler))
        .nest("/api", api::routes::user_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), identity::layer));

    let internal = api::routes::internal_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        trusted_subnet::layer,
    ));

    Router::new()
        .merge(identified)
        .nest("/api/internal", internal)
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/{code}", get(redirect_handler))
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router with trailing slashes trimmed.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}
