pub mod middleware;
pub mod rate_limit;
pub mod rest;
pub mod state;

pub use middleware::{rate_limit, require_admin};
pub use rest::{get_chapter_handler, list_chapters_handler, upload_chapters_handler};

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{HeaderName, HeaderValue},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers added to every response that does not already carry them.
pub const SECURITY_HEADERS: [(&str, &str); 9] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

fn with_security_headers(router: Router) -> Router {
    SECURITY_HEADERS.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

/// Builds the chapter API router, nested under `/api/v1`.
///
/// Every route is rate limited; only the upload route requires the admin header.
pub fn build_router(state: Arc<AppState>) -> Router {
    let chapter_routes = Router::new()
        .route(
            "/chapters",
            get(list_chapters_handler)
                .post(upload_chapters_handler.layer(axum_middleware::from_fn(require_admin))),
        )
        .route("/chapters/{id}", get(get_chapter_handler));

    let router = Router::new()
        .nest("/api/v1", chapter_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    with_security_headers(router).layer(TraceLayer::new_for_http())
}
