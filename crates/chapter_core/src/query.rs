//! crates/chapter_core/src/query.rs
//!
//! The read path: filtered, paginated chapter listings fronted by the query
//! cache, and uncached single-chapter lookups.

use crate::domain::{Chapter, ChapterFilter, ChapterPage, ChapterStatus};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{ChapterStore, PortError, QueryCache};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Every cached listing key starts with this prefix.
pub const CACHE_NAMESPACE: &str = "chapters:";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

//=========================================================================================
// Listing Parameters
//=========================================================================================

/// Raw listing parameters exactly as a caller supplied them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub unit: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub is_weak_chapter: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A validated listing request with pagination defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterQuery {
    pub filter: ChapterFilter,
    pub page: u64,
    pub limit: u64,
}

impl ChapterQuery {
    /// Parses raw parameters. Empty strings count as absent.
    pub fn parse(params: &ListParams) -> ServiceResult<Self> {
        let status = present(&params.status)
            .map(|s| s.parse::<ChapterStatus>().map_err(ServiceError::BadInput))
            .transpose()?;

        let is_weak_chapter = match present(&params.is_weak_chapter) {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(ServiceError::BadInput(format!(
                    "`isWeakChapter` must be \"true\" or \"false\", got \"{}\"",
                    other
                )))
            }
        };

        Ok(Self {
            filter: ChapterFilter {
                class_name: present(&params.class_name).map(str::to_string),
                unit: present(&params.unit).map(str::to_string),
                subject: present(&params.subject).map(str::to_string),
                status,
                is_weak_chapter,
            },
            page: positive("page", &params.page, DEFAULT_PAGE)?,
            limit: positive("limit", &params.limit, DEFAULT_LIMIT)?,
        })
    }

    /// Number of matching records before this page's window.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Deterministic fingerprint of the query.
    ///
    /// Built from the normalized query, so parameter order and spelled-out
    /// defaults (`page=1`) do not produce distinct entries.
    pub fn cache_key(&self) -> String {
        let mut fields = Map::new();
        let filter = &self.filter;
        if let Some(class_name) = &filter.class_name {
            fields.insert("class".to_string(), Value::from(class_name.as_str()));
        }
        if let Some(unit) = &filter.unit {
            fields.insert("unit".to_string(), Value::from(unit.as_str()));
        }
        if let Some(subject) = &filter.subject {
            fields.insert("subject".to_string(), Value::from(subject.as_str()));
        }
        if let Some(status) = filter.status {
            fields.insert("status".to_string(), Value::from(status.as_str()));
        }
        if let Some(weak) = filter.is_weak_chapter {
            fields.insert("isWeakChapter".to_string(), Value::from(weak));
        }
        fields.insert("page".to_string(), Value::from(self.page));
        fields.insert("limit".to_string(), Value::from(self.limit));

        format!("{}{}", CACHE_NAMESPACE, Value::Object(fields))
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

fn positive(name: &str, raw: &Option<String>, default: u64) -> ServiceResult<u64> {
    match present(raw) {
        None => Ok(default),
        Some(text) => match text.trim().parse::<u64>() {
            Ok(value) if value >= 1 => Ok(value),
            _ => Err(ServiceError::BadInput(format!(
                "`{}` must be a positive integer, got \"{}\"",
                name, text
            ))),
        },
    }
}

//=========================================================================================
// Query Service
//=========================================================================================

/// Serves chapter reads from the cache when possible and the store otherwise.
pub struct QueryService {
    store: Arc<dyn ChapterStore>,
    cache: Arc<dyn QueryCache>,
    ttl: Duration,
}

impl QueryService {
    pub fn new(store: Arc<dyn ChapterStore>, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            store,
            cache,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Overrides how long cached listings live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lists chapters matching the raw parameters.
    pub async fn list(&self, params: &ListParams) -> ServiceResult<ChapterPage> {
        let query = ChapterQuery::parse(params)?;
        self.list_query(&query).await
    }

    /// Lists chapters for an already validated query.
    pub async fn list_query(&self, query: &ChapterQuery) -> ServiceResult<ChapterPage> {
        let key = query.cache_key();

        if let Some(cached) = self.cache.get(&key).await? {
            match serde_json::from_str::<ChapterPage>(&cached) {
                Ok(page) => {
                    debug!(%key, "Query cache hit");
                    return Ok(page);
                }
                Err(e) => warn!(%key, error = %e, "Discarding unreadable cache entry"),
            }
        }
        debug!(%key, "Query cache miss");

        let total = self.store.count_matching(&query.filter).await?;
        let chapters = self
            .store
            .find_page(&query.filter, query.skip(), query.limit)
            .await?;
        let page = ChapterPage {
            total,
            page: query.page,
            limit: query.limit,
            chapters,
        };

        let encoded = serde_json::to_string(&page)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode page: {}", e)))?;
        self.cache.set(&key, &encoded, self.ttl).await?;

        Ok(page)
    }

    /// Looks up one chapter by its identifier. Never cached.
    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Chapter> {
        let id = Uuid::parse_str(id).map_err(|_| ServiceError::InvalidId(id.to_string()))?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Chapter {} not found", id)))
    }
}
