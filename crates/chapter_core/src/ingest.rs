//! crates/chapter_core/src/ingest.rs
//!
//! The bulk write path. Each candidate in a batch is validated and stored on
//! its own; one bad record never aborts the rest. Once the batch has been
//! processed every cached listing is dropped.

use crate::domain::{Chapter, NewChapter};
use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::ports::{ChapterStore, PortError, PortResult, QueryCache};
use crate::query::CACHE_NAMESPACE;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a single candidate was not stored.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PortError),
}

/// A candidate that could not be stored, echoed back with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRecord {
    /// Position of the candidate in the submitted batch.
    pub index: usize,
    pub entry: Value,
    pub error: String,
}

/// Outcome of a batch upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub message: String,
    pub success_count: usize,
    pub failed: Vec<FailedRecord>,
}

impl IngestReport {
    fn new(success_count: usize, failed: Vec<FailedRecord>) -> Self {
        let message = if success_count == 1 {
            "Chapter uploaded successfully.".to_string()
        } else {
            format!("{} chapters uploaded successfully.", success_count)
        };
        Self {
            message,
            success_count,
            failed,
        }
    }
}

pub struct IngestService {
    store: Arc<dyn ChapterStore>,
    cache: Arc<dyn QueryCache>,
}

impl IngestService {
    pub fn new(store: Arc<dyn ChapterStore>, cache: Arc<dyn QueryCache>) -> Self {
        Self { store, cache }
    }

    /// Stores every valid candidate of a JSON array batch.
    ///
    /// Only a non-array batch or a failed cache invalidation fails the call;
    /// per-record problems end up in `IngestReport::failed`, in input order.
    /// Cached listings are invalidated even when nothing was stored.
    pub async fn ingest_batch(&self, batch: &Value) -> ServiceResult<IngestReport> {
        let Value::Array(candidates) = batch else {
            return Err(ServiceError::BadInput(
                "Invalid format. Expected an array.".to_string(),
            ));
        };

        let mut success_count = 0;
        let mut failed = Vec::new();

        // Sequential on purpose: the tally must not depend on scheduling.
        for (index, candidate) in candidates.iter().enumerate() {
            match self.ingest_one(candidate).await {
                Ok(chapter) => {
                    debug!(index, id = %chapter.id, "Chapter stored");
                    success_count += 1;
                }
                Err(e) => {
                    warn!(index, error = %e, "Chapter rejected");
                    failed.push(FailedRecord {
                        index,
                        entry: candidate.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let invalidated = self.invalidate_listings().await?;
        info!(
            received = candidates.len(),
            stored = success_count,
            failed = failed.len(),
            invalidated,
            "Chapter batch processed"
        );

        Ok(IngestReport::new(success_count, failed))
    }

    async fn ingest_one(&self, candidate: &Value) -> Result<Chapter, RecordError> {
        let chapter = NewChapter::from_candidate(candidate)?;
        Ok(self.store.insert(chapter).await?)
    }

    /// Removes every cached listing. Returns how many entries were dropped.
    pub async fn invalidate_listings(&self) -> PortResult<usize> {
        let keys = self.cache.list_keys(CACHE_NAMESPACE).await?;
        if !keys.is_empty() {
            self.cache.delete_many(&keys).await?;
        }
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChapterStatus;
    use crate::query::{ListParams, QueryService};
    use crate::testing::{candidate, RecordingCache, RecordingStore};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn services(
        store: Arc<RecordingStore>,
        cache: Arc<RecordingCache>,
    ) -> (QueryService, IngestService) {
        (
            QueryService::new(store.clone(), cache.clone()),
            IngestService::new(store, cache),
        )
    }

    #[tokio::test]
    async fn one_invalid_record_does_not_sink_the_batch() {
        let store = Arc::new(RecordingStore::default());
        let (_, ingest) = services(store.clone(), Arc::new(RecordingCache::default()));

        let mut second = candidate("Chemistry", "Class 11", ChapterStatus::NotStarted, false);
        second.as_object_mut().unwrap().remove("status");
        let batch = json!([
            candidate("Physics", "Class 11", ChapterStatus::Completed, false),
            second.clone(),
            candidate("Maths", "Class 12", ChapterStatus::InProgress, true),
        ]);

        let report = ingest.ingest_batch(&batch).await.unwrap();

        assert_eq!(report.success_count, 2);
        assert_eq!(report.message, "2 chapters uploaded successfully.");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(report.failed[0].entry, second);
        assert!(report.failed[0].error.contains("status"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn persistence_failures_are_recorded_per_record() {
        let store = Arc::new(RecordingStore {
            reject_subject: Some("Biology".to_string()),
            ..Default::default()
        });
        let (_, ingest) = services(store.clone(), Arc::new(RecordingCache::default()));

        let batch = json!([
            candidate("Biology", "Class 11", ChapterStatus::Completed, false),
            candidate("Physics", "Class 11", ChapterStatus::Completed, false),
        ]);
        let report = ingest.ingest_batch(&batch).await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.message, "Chapter uploaded successfully.");
        assert_eq!(report.failed[0].index, 0);
        assert!(report.failed[0].error.contains("insert rejected"));
    }

    #[tokio::test]
    async fn non_array_batch_is_rejected_before_touching_the_store() {
        let store = Arc::new(RecordingStore::default());
        let cache = Arc::new(RecordingCache::default());
        cache.insert_raw("chapters:{}", "{}");
        let (_, ingest) = services(store.clone(), cache.clone());

        let single = candidate("Physics", "Class 11", ChapterStatus::Completed, false);
        let err = ingest.ingest_batch(&single).await.unwrap_err();

        assert!(matches!(err, ServiceError::BadInput(_)));
        assert_eq!(store.store_calls(), 0);
        assert_eq!(cache.keys(), vec!["chapters:{}".to_string()]);
    }

    #[tokio::test]
    async fn successful_ingest_invalidates_cached_listings() {
        let store = Arc::new(RecordingStore::default());
        let cache = Arc::new(RecordingCache::default());
        cache.insert_raw("sessions:keep-me", "x");
        let (query, ingest) = services(store.clone(), cache.clone());

        let before = query.list(&ListParams::default()).await.unwrap();
        assert_eq!(before.total, 0);

        ingest
            .ingest_batch(&json!([candidate(
                "Physics",
                "Class 11",
                ChapterStatus::Completed,
                false
            )]))
            .await
            .unwrap();
        assert_eq!(cache.keys(), vec!["sessions:keep-me".to_string()]);

        let after = query.list(&ListParams::default()).await.unwrap();
        assert_eq!(after.total, 1);
        assert_eq!(after.chapters[0].subject, "Physics");
    }

    #[tokio::test]
    async fn invalidation_runs_even_when_every_record_fails() {
        let store = Arc::new(RecordingStore::default());
        let cache = Arc::new(RecordingCache::default());
        cache.insert_raw("chapters:{\"limit\":10,\"page\":1}", "{}");
        let (_, ingest) = services(store.clone(), cache.clone());

        let report = ingest
            .ingest_batch(&json!([{ "subject": "Physics" }, 42]))
            .await
            .unwrap();

        assert_eq!(report.success_count, 0);
        assert_eq!(report.message, "0 chapters uploaded successfully.");
        assert_eq!(report.failed.len(), 2);
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
        assert!(cache.keys().is_empty());
        assert_eq!(cache.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_accepted() {
        let (_, ingest) = services(
            Arc::new(RecordingStore::default()),
            Arc::new(RecordingCache::default()),
        );

        let report = ingest.ingest_batch(&json!([])).await.unwrap();
        assert_eq!(report.success_count, 0);
        assert!(report.failed.is_empty());
    }
}
