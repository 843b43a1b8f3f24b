pub mod domain;
pub mod error;
pub mod ingest;
pub mod ports;
pub mod query;

#[cfg(test)]
mod testing;

pub use domain::{Chapter, ChapterFilter, ChapterPage, ChapterStatus, NewChapter};
pub use error::{FieldError, ServiceError, ServiceResult, ValidationError};
pub use ingest::{FailedRecord, IngestReport, IngestService};
pub use ports::{ChapterStore, PortError, PortResult, QueryCache};
pub use query::{ChapterQuery, ListParams, QueryService, CACHE_NAMESPACE, DEFAULT_CACHE_TTL};
