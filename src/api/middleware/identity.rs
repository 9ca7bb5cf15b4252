//! User identity middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;

use crate::{error::AppError, state::AppState};

/// Attaches a [`crate::application::services::UserIdentity`] to every request.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <user_id>.<signature>
/// ```
///
/// # Flow
///
/// 1. No `Authorization` header: a fresh identity is issued and its token is
///    returned in the `Authorization` response header
/// 2. Header present: the token is verified and its user id is used
/// 3. The identity is stored in the request extensions for handlers
///
/// # Errors
///
/// Returns `401 Unauthorized` if the header is not a Bearer token or the
/// token signature does not verify.
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let identity = if parts.headers.contains_key(header::AUTHORIZATION) {
        let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
            .await
            .map_err(|_| {
                AppError::unauthorized(
                    "Unauthorized",
                    serde_json::json!({"reason": "Authorization header is not a Bearer token"}),
                )
            })?;
        st.identity_service.verify(&token)?
    } else {
        let issued = st.identity_service.issue();
        tracing::debug!(user_id = %issued.user_id, "Issued new user identity");
        issued
    };

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(identity.clone());

    let mut response = next.run(req).await;

    if identity.is_new
        && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", identity.token))
    {
        response.headers_mut().insert(header::AUTHORIZATION, value);
    }

    Ok(response)
}
