//! services/api/src/adapters/db.rs
//!
//! This module contains the record store adapter, which is the concrete implementation
//! of the `ChapterStore` port from the `core` crate. It handles all interactions
//! with the `chapters` table in PostgreSQL using `sqlx`.

use super::port_error;
use async_trait::async_trait;
use chapter_core::domain::{Chapter, ChapterFilter, NewChapter};
use chapter_core::ports::{ChapterStore, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use uuid::Uuid;

const CHAPTER_COLUMNS: &str = "id, subject, chapter, class, unit, year_wise_question_count, \
     question_solved, status, is_weak_chapter, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ChapterStore` port.
#[derive(Clone)]
pub struct PgChapterStore {
    pool: PgPool,
}

impl PgChapterStore {
    /// Creates a new `PgChapterStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    /// Creates both the `chapters` and the `query_cache` tables.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ChapterRecord {
    id: Uuid,
    subject: String,
    chapter: String,
    class: String,
    unit: String,
    year_wise_question_count: Json<BTreeMap<String, i64>>,
    question_solved: i64,
    status: String,
    is_weak_chapter: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChapterRecord {
    fn to_domain(self) -> PortResult<Chapter> {
        let status = self.status.parse().map_err(PortError::Unexpected)?;
        let question_solved = u64::try_from(self.question_solved).map_err(|_| {
            PortError::Unexpected(format!(
                "Chapter {} has a negative question_solved",
                self.id
            ))
        })?;

        Ok(Chapter {
            id: self.id,
            subject: self.subject,
            chapter: self.chapter,
            class_name: self.class,
            unit: self.unit,
            year_wise_question_count: self.year_wise_question_count.0,
            question_solved,
            status,
            is_weak_chapter: self.is_weak_chapter,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Appends a `WHERE` clause with one bound equality per constrained field.
fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &ChapterFilter) {
    builder.push(" WHERE TRUE");
    if let Some(class_name) = &filter.class_name {
        builder.push(" AND class = ").push_bind(class_name.clone());
    }
    if let Some(unit) = &filter.unit {
        builder.push(" AND unit = ").push_bind(unit.clone());
    }
    if let Some(subject) = &filter.subject {
        builder.push(" AND subject = ").push_bind(subject.clone());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(weak) = filter.is_weak_chapter {
        builder.push(" AND is_weak_chapter = ").push_bind(weak);
    }
}

fn to_sql_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_query(filter: &ChapterFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM chapters");
    push_filter(&mut builder, filter);
    builder
}

fn page_query(filter: &ChapterFilter, skip: u64, limit: u64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM chapters", CHAPTER_COLUMNS));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY created_at ASC, id ASC LIMIT ")
        .push_bind(to_sql_count(limit))
        .push(" OFFSET ")
        .push_bind(to_sql_count(skip));
    builder
}

//=========================================================================================
// `ChapterStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChapterStore for PgChapterStore {
    async fn count_matching(&self, filter: &ChapterFilter) -> PortResult<u64> {
        let mut builder = count_query(filter);
        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(count.max(0) as u64)
    }

    async fn find_page(
        &self,
        filter: &ChapterFilter,
        skip: u64,
        limit: u64,
    ) -> PortResult<Vec<Chapter>> {
        let mut builder = page_query(filter, skip, limit);
        let records = builder
            .build_query_as::<ChapterRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(port_error)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<Option<Chapter>> {
        let record = sqlx::query_as::<_, ChapterRecord>(&format!(
            "SELECT {} FROM chapters WHERE id = $1",
            CHAPTER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;

        record.map(|r| r.to_domain()).transpose()
    }

    async fn insert(&self, chapter: NewChapter) -> PortResult<Chapter> {
        let question_solved = i64::try_from(chapter.question_solved).map_err(|_| {
            PortError::Unexpected("questionSolved does not fit in a BIGINT".to_string())
        })?;

        let record = sqlx::query_as::<_, ChapterRecord>(&format!(
            "INSERT INTO chapters (id, subject, chapter, class, unit, year_wise_question_count, \
             question_solved, status, is_weak_chapter) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            CHAPTER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(chapter.subject)
        .bind(chapter.chapter)
        .bind(chapter.class_name)
        .bind(chapter.unit)
        .bind(Json(chapter.year_wise_question_count))
        .bind(question_solved)
        .bind(chapter.status.as_str())
        .bind(chapter.is_weak_chapter)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;

        record.to_domain()
    }
}
