pub mod cache;
pub mod db;
pub mod memory;

pub use cache::PgQueryCache;
pub use db::PgChapterStore;
pub use memory::{MemoryChapterStore, MemoryQueryCache};

use async_trait::async_trait;
use chapter_core::ports::{PortError, PortResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A cache whose dead entries must be swept explicitly.
#[async_trait]
pub trait ExpiringCache: Send + Sync {
    /// Drops every expired entry. Returns how many were removed.
    async fn purge_expired(&self) -> PortResult<u64>;
}

/// Periodically purges expired entries until the runtime shuts down.
pub fn spawn_expiry_sweeper(cache: Arc<dyn ExpiringCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match cache.purge_expired().await {
                Ok(removed) => debug!(removed, "Purged expired cache entries"),
                Err(e) => error!("Failed to purge expired cache entries: {:?}", e),
            }
        }
    })
}

/// Maps a `sqlx` failure onto the port error taxonomy.
pub(crate) fn port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}
