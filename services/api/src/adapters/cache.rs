//! services/api/src/adapters/cache.rs
//!
//! A `QueryCache` backed by the `query_cache` table. Every server process
//! sharing the database sees the same cached listings and the same
//! invalidations.

use super::{port_error, ExpiringCache};
use async_trait::async_trait;
use chapter_core::ports::{PortError, PortResult, QueryCache};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

#[derive(Clone)]
pub struct PgQueryCache {
    pool: PgPool,
}

impl PgQueryCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LIST_KEYS_SQL: &str = "SELECT key FROM query_cache WHERE key LIKE $1 ESCAPE '\\' ORDER BY key";
const DELETE_KEYS_SQL: &str = "DELETE FROM query_cache WHERE key = ANY($1)";

/// Escapes `LIKE` wildcards so a prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> PortResult<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| PortError::Unexpected(format!("Cache TTL of {:?} is out of range", ttl)))
}

#[async_trait]
impl QueryCache for PgQueryCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM query_cache WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        let expires_at = expiry(Utc::now(), ttl)?;

        sqlx::query(
            "INSERT INTO query_cache (key, value, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(LIST_KEYS_SQL)
            .bind(like_prefix(prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(port_error)
    }

    async fn delete_many(&self, keys: &[String]) -> PortResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        sqlx::query(DELETE_KEYS_SQL)
            .bind(keys)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(())
    }
}

#[async_trait]
impl ExpiringCache for PgQueryCache {
    async fn purge_expired(&self) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM query_cache WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(result.rows_affected())
    }
}
