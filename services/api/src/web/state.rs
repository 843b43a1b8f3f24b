//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::rate_limit::RateLimiter;
use chapter_core::ports::{ChapterStore, QueryCache};
use chapter_core::{IngestService, QueryService};
use std::sync::Arc;
use std::time::Duration;

/// Length of one rate-limiting window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryService>,
    pub ingest: Arc<IngestService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires both services to the same store and cache.
    pub fn new(
        store: Arc<dyn ChapterStore>,
        cache: Arc<dyn QueryCache>,
        config: &Config,
    ) -> Self {
        let query = QueryService::new(store.clone(), cache.clone()).with_ttl(config.cache_ttl);
        let ingest = IngestService::new(store, cache);
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute, RATE_LIMIT_WINDOW);

        Self {
            query: Arc::new(query),
            ingest: Arc::new(ingest),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
