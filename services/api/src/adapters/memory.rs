//! services/api/src/adapters/memory.rs
//!
//! In-process implementations of both ports. The cache can be selected in
//! production with `CACHE_BACKEND=memory`; the store backs the HTTP tests.

use super::ExpiringCache;
use async_trait::async_trait;
use chapter_core::domain::{Chapter, ChapterFilter, NewChapter};
use chapter_core::ports::{ChapterStore, PortError, PortResult, QueryCache};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

//=========================================================================================
// Record Store
//=========================================================================================

/// Chapters kept in insertion order.
#[derive(Default)]
pub struct MemoryChapterStore {
    chapters: RwLock<Vec<Chapter>>,
}

impl MemoryChapterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChapterStore for MemoryChapterStore {
    async fn count_matching(&self, filter: &ChapterFilter) -> PortResult<u64> {
        let chapters = self.chapters.read().await;
        Ok(chapters.iter().filter(|c| filter.matches(c)).count() as u64)
    }

    async fn find_page(
        &self,
        filter: &ChapterFilter,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Chapter>> {
        let chapters = self.chapters.read().await;
        Ok(chapters
            .iter()
            .filter(|c| filter.matches(c))
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<Chapter>> {
        let chapters = self.chapters.read().await;
        Ok(chapters.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, chapter: NewChapter) -> PortResult<Chapter> {
        let now = Utc::now();
        let stored = Chapter {
            id: Uuid::new_v4(),
            subject: chapter.subject,
            chapter: chapter.chapter,
            class_name: chapter.class_name,
            unit: chapter.unit,
            year_wise_question_count: chapter.year_wise_question_count,
            question_solved: chapter.question_solved,
            status: chapter.status,
            is_weak_chapter: chapter.is_weak_chapter,
            created_at: now,
            updated_at: now,
        };
        self.chapters.write().await.push(stored.clone());
        Ok(stored)
    }
}

//=========================================================================================
// Query Cache
//=========================================================================================

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Default)]
pub struct MemoryQueryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryCache for MemoryQueryCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| {
            PortError::Unexpected(format!("Cache TTL of {:?} is out of range", ttl))
        })?;
        let entry = CacheEntry {
            value: value.to_string(),
            expires_at,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> PortResult<Vec<String>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete_many(&self, keys: &[String]) -> PortResult<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl ExpiringCache for MemoryQueryCache {
    async fn purge_expired(&self) -> PortResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        Ok((before - entries.len()) as u64)
    }
}
