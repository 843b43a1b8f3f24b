//! Recording fakes for the store and cache ports, used by the service tests.

use crate::domain::{Chapter, ChapterFilter, ChapterStatus, NewChapter};
use crate::ports::{ChapterStore, PortError, PortResult, QueryCache};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
pub struct RecordingStore {
    pub chapters: Mutex<Vec<Chapter>>,
    /// Inserts of chapters with this subject fail with a store error.
    pub reject_subject: Option<String>,
    pub count_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub last_window: Mutex<Option<(u64, u64)>>,
}

impl RecordingStore {
    pub fn with_chapters(chapters: Vec<Chapter>) -> Self {
        Self {
            chapters: Mutex::new(chapters),
            ..Default::default()
        }
    }

    pub fn store_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
            + self.page_calls.load(Ordering::SeqCst)
            + self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.chapters.lock().unwrap().len()
    }
}

#[async_trait]
impl ChapterStore for RecordingStore {
    async fn count_matching(&self, filter: &ChapterFilter) -> PortResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        let chapters = self.chapters.lock().unwrap();
        Ok(chapters.iter().filter(|c| filter.matches(c)).count() as u64)
    }

    async fn find_page(
        &self,
        filter: &ChapterFilter,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Chapter>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_window.lock().unwrap() = Some((skip, limit));
        let chapters = self.chapters.lock().unwrap();
        Ok(chapters
            .iter()
            .filter(|c| filter.matches(c))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<Chapter>> {
        let chapters = self.chapters.lock().unwrap();
        Ok(chapters.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, chapter: NewChapter) -> PortResult<Chapter> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_subject.as_deref() == Some(chapter.subject.as_str()) {
            return Err(PortError::Unexpected("insert rejected".to_string()));
        }
        let stored = stored(chapter);
        self.chapters.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
pub struct RecordingCache {
    pub entries: Mutex<HashMap<String, String>>,
    pub fail_reads: bool,
    pub set_calls: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub last_ttl: Mutex<Option<Duration>>,
}

impl RecordingCache {
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl QueryCache for RecordingCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        if self.fail_reads {
            return Err(PortError::Unavailable("cache offline".to_string()));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> PortResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_ttl.lock().unwrap() = Some(ttl);
        self.insert_raw(key, value);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> PortResult<Vec<String>> {
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn delete_many(&self, keys: &[String]) -> PortResult<()> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key);
        }
        self.deleted.lock().unwrap().extend(keys.iter().cloned());
        Ok(())
    }
}

pub fn stored(chapter: NewChapter) -> Chapter {
    let now = Utc::now();
    Chapter {
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
    }
}

pub fn candidate(subject: &str, class_name: &str, status: ChapterStatus, weak: bool) -> Value {
    json!({
        "subject": subject,
        "chapter": format!("{} basics", subject),
        "class": class_name,
        "unit": "Unit 1",
        "yearWiseQuestionCount": { "2023": 4, "2024": 6 },
        "questionSolved": 3,
        "status": status.as_str(),
        "isWeakChapter": weak
    })
}

pub fn chapter(subject: &str, class_name: &str, status: ChapterStatus, weak: bool) -> Chapter {
    let draft = NewChapter::from_candidate(&candidate(subject, class_name, status, weak))
        .expect("fixture candidate is valid");
    stored(draft)
}
