//! Access control for internal endpoints by client subnet.

use std::net::IpAddr;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Header carrying the client address, set by the fronting proxy.
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Lets a request through only if `X-Real-IP` lies inside the trusted subnet.
///
/// # Errors
///
/// Returns `403 Forbidden` if no subnet is configured, the header is missing
/// or unparsable, or the address is outside the subnet.
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(subnet) = st.trusted_subnet else {
        return Err(AppError::forbidden(
            "Forbidden",
            json!({ "reason": "No trusted subnet configured" }),
        ));
    };

    let ip = req
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .ok_or_else(|| {
            AppError::forbidden(
                "Forbidden",
                json!({ "reason": "X-Real-IP header is missing or invalid" }),
            )
        })?;

    if !subnet.contains(ip) {
        tracing::warn!(%ip, %subnet, "Rejected request from untrusted address");
        return Err(AppError::forbidden(
            "Forbidden",
            json!({ "reason": "Address is outside the trusted subnet" }),
        ));
    }

    Ok(next.run(req).await)
}
