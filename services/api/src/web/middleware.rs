//! services/api/src/web/middleware.rs
//!
//! Admin gate and per-client rate limiting.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use crate::web::rest::ErrorResponse;
use crate::web::state::AppState;

/// Header a caller sets to `true` to perform writes.
pub const ADMIN_HEADER: &str = "x-admin";

/// Middleware that only lets requests carrying `x-admin: true` through.
///
/// Anything else is answered with 403 before the body is read.
pub async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req
        .headers()
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true");

    if !is_admin {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Only admins can perform this action")),
        )
            .into_response();
    }

    next.run(req).await
}

/// Middleware that answers 429 once a client exceeds its per-minute quota.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);

    if !state.rate_limiter.try_acquire(&client).await {
        warn!(%client, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(
                "Too many requests. Please try again in a minute.",
            )),
        )
            .into_response();
    }

    next.run(req).await
}

/// Identifies the caller by peer IP, then by the first `x-forwarded-for` hop.
fn client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
