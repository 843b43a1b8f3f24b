//! crates/chapter_core/src/error.rs
//!
//! Error types raised by the query and ingest services.

use crate::ports::PortError;

/// A single rule a candidate record broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Raised when an upload candidate does not describe a valid chapter.
///
/// Only produced inside batch ingest, where it is recorded against the
/// offending entry instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Chapter validation failed: {}", render_fields(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }
}

fn render_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The error type returned by the core service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request itself is malformed (bad parameters, non-array batch).
    #[error("{0}")]
    BadInput(String),

    /// The identifier is not in the store's identifier format.
    #[error("Invalid chapter id: {0}")]
    InvalidId(String),

    /// The identifier is well-formed but nothing is stored under it.
    #[error("{0}")]
    NotFound(String),

    /// The record store or the query cache failed.
    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] PortError),
}

/// A convenience type alias for `Result<T, ServiceError>`.
pub type ServiceResult<T> = Result<T, ServiceError>;
