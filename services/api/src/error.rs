//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how it is
//! rendered as an HTTP response.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use crate::web::rest::ErrorResponse;
use chapter_core::ServiceError;
use tracing::error;

/// The primary error type for the `chapter_api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the query or ingest service.
    #[error("Service Error: {0}")]
    Service(#[from] ServiceError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be read (bad JSON body, bad query string).
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Service(ServiceError::BadInput(message)) => {
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Service(e @ ServiceError::InvalidId(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Service(ServiceError::NotFound(message)) => {
                (StatusCode::NOT_FOUND, message)
            }
            other => {
                error!("Request failed: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
