//! crates/chapter_core/src/ports.rs
//!
//! Defines the collaborator contracts (traits) the chapter services depend on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete record store and cache.

use crate::domain::{Chapter, ChapterFilter, NewChapter};
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Store or cache unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistent collection of chapters.
#[async_trait]
pub trait ChapterStore: Send + Sync {
    /// Counts every chapter the filter matches.
    async fn count_matching(&self, filter: &ChapterFilter) -> PortResult<u64>;

    /// Returns at most `limit` matching chapters after skipping `skip` of them.
    /// Implementations must use a stable order so page windows do not overlap.
    async fn find_page(
        &self,
        filter: &ChapterFilter,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Chapter>>;

    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<Chapter>>;

    /// Persists a validated chapter, assigning its identity and timestamps.
    async fn insert(&self, chapter: NewChapter) -> PortResult<Chapter>;
}

/// String key-value cache with per-entry expiry.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()>;

    async fn list_keys(&self, prefix: &str) -> PortResult<Vec<String>>;

    async fn delete_many(&self, keys: &[String]) -> PortResult<()>;
}
