use serde_json::Value;

use super::domain::{RequestId, RequestRecord};
use crate::store::query::RecordQuery;

/// Storage abstraction so the submission and chat services can be exercised in isolation.
pub trait RequestRepository: Send + Sync {
    fn insert(&self, record: RequestRecord) -> Result<RequestRecord, RepositoryError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError>;
    /// Run a parsed query against the stored documents, returning projected rows.
    fn query(&self, query: &RecordQuery) -> Result<Vec<Value>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
