//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the chapter endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use chapter_core::{Chapter, ChapterPage, FailedRecord, IngestReport, ListParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_chapters_handler,
        get_chapter_handler,
        upload_chapters_handler,
    ),
    components(
        schemas(ChapterResponse, ChapterListResponse, UploadChaptersResponse, FailedUpload, ErrorResponse)
    ),
    tags(
        (name = "Chapters API", description = "Filtered listings and bulk upload of chapters.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Body of every error response.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Filters and pagination for `GET /chapters`. All values arrive as strings.
#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListChaptersQuery {
    /// Exact class label, e.g. `Class 11`.
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub unit: Option<String>,
    pub subject: Option<String>,
    /// One of `Not Started`, `In Progress`, `Completed`.
    pub status: Option<String>,
    /// `true` or `false`.
    pub is_weak_chapter: Option<String>,
    /// 1-based page number, default 1.
    pub page: Option<String>,
    /// Page size, default 10.
    pub limit: Option<String>,
}

impl From<ListChaptersQuery> for ListParams {
    fn from(q: ListChaptersQuery) -> Self {
        ListParams {
            class_name: q.class_name,
            unit: q.unit,
            subject: q.subject,
            status: q.status,
            is_weak_chapter: q.is_weak_chapter,
            page: q.page,
            limit: q.limit,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterResponse {
    pub id: Uuid,
    pub subject: String,
    pub chapter: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub unit: String,
    pub year_wise_question_count: BTreeMap<String, i64>,
    pub question_solved: u64,
    #[schema(example = "In Progress")]
    pub status: String,
    pub is_weak_chapter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Chapter> for ChapterResponse {
    fn from(c: Chapter) -> Self {
        Self {
            id: c.id,
            subject: c.subject,
            chapter: c.chapter,
            class_name: c.class_name,
            unit: c.unit,
            year_wise_question_count: c.year_wise_question_count,
            question_solved: c.question_solved,
            status: c.status.as_str().to_string(),
            is_weak_chapter: c.is_weak_chapter,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// One page of a chapter listing.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChapterListResponse {
    /// Number of chapters matching the filters, across all pages.
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub chapters: Vec<ChapterResponse>,
}

impl From<ChapterPage> for ChapterListResponse {
    fn from(p: ChapterPage) -> Self {
        Self {
            total: p.total,
            page: p.page,
            limit: p.limit,
            chapters: p.chapters.into_iter().map(ChapterResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct FailedUpload {
    /// Position of the entry in the uploaded array.
    pub index: usize,
    /// The entry exactly as it was submitted.
    pub entry: Value,
    pub error: String,
}

impl From<FailedRecord> for FailedUpload {
    fn from(f: FailedRecord) -> Self {
        Self {
            index: f.index,
            entry: f.entry,
            error: f.error,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadChaptersResponse {
    pub message: String,
    pub success_count: usize,
    pub failed: Vec<FailedUpload>,
}

impl From<IngestReport> for UploadChaptersResponse {
    fn from(r: IngestReport) -> Self {
        Self {
            message: r.message,
            success_count: r.success_count,
            failed: r.failed.into_iter().map(FailedUpload::from).collect(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List chapters.
///
/// Results are cached per distinct query for an hour, or until the next upload.
#[utoipa::path(
    get,
    path = "/api/v1/chapters",
    params(ListChaptersQuery),
    responses(
        (status = 200, description = "A page of matching chapters", body = ChapterListResponse),
        (status = 400, description = "Invalid filter or pagination value", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_chapters_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListChaptersQuery>, QueryRejection>,
) -> Result<Json<ChapterListResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = state.query.list(&query.into()).await?;
    Ok(Json(page.into()))
}

/// Get a single chapter by id.
#[utoipa::path(
    get,
    path = "/api/v1/chapters/{id}",
    params(
        ("id" = String, Path, description = "The chapter's UUID.")
    ),
    responses(
        (status = 200, description = "The chapter", body = ChapterResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "No chapter with this id", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    )
)]
pub async fn get_chapter_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ChapterResponse>, ApiError> {
    let chapter = state.query.get_by_id(&id).await?;
    Ok(Json(chapter.into()))
}

/// Upload a batch of chapters.
///
/// Each entry is validated and stored independently. The response is 201 even
/// when some entries failed; inspect `failed` to find them.
#[utoipa::path(
    post,
    path = "/api/v1/chapters",
    request_body(content = Vec<Value>, description = "An array of chapter objects."),
    params(
        ("x-admin" = String, Header, description = "Must be `true`.")
    ),
    responses(
        (status = 201, description = "Batch processed", body = UploadChaptersResponse),
        (status = 400, description = "Body is not a JSON array", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_chapters_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<UploadChaptersResponse>), ApiError> {
    let Json(batch) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let report = state.ingest.ingest_batch(&batch).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}
