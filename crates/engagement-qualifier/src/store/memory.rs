use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::query::RecordQuery;
use crate::workflows::qualification::domain::{RequestId, RequestRecord};
use crate::workflows::qualification::repository::{RepositoryError, RequestRepository};

/// Process-local request store, optionally mirrored to a JSON snapshot on disk.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRequestStore {
    records: Arc<Mutex<Vec<RequestRecord>>>,
    snapshot: Option<PathBuf>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading existing records when the file exists.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let records = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|err| {
                RepositoryError::Unavailable(format!("reading {}: {err}", path.display()))
            })?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<RequestRecord>>(&raw).map_err(|err| {
                    RepositoryError::Unavailable(format!("parsing {}: {err}", path.display()))
                })?
            }
        } else {
            Vec::new()
        };

        info!(path = %path.display(), records = records.len(), "request store opened");

        Ok(Self {
            records: Arc::new(Mutex::new(records)),
            snapshot: Some(path),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<RequestRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("request store lock poisoned".to_string()))
    }

    fn persist(&self, records: &[RequestRecord]) -> Result<(), RepositoryError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        write_snapshot(path, records).map_err(|err| {
            warn!(path = %path.display(), error = %err, "failed to write request snapshot");
            RepositoryError::Unavailable(err)
        })
    }
}

fn write_snapshot(path: &Path, records: &[RequestRecord]) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    let payload = serde_json::to_vec_pretty(records).map_err(|err| err.to_string())?;
    fs::write(path, payload).map_err(|err| err.to_string())
}

impl RequestRepository for InMemoryRequestStore {
    fn insert(&self, record: RequestRecord) -> Result<RequestRecord, RepositoryError> {
        let mut records = self.lock()?;
        if records
            .iter()
            .any(|existing| existing.request_id == record.request_id)
        {
            return Err(RepositoryError::Conflict);
        }
        records.push(record.clone());

        if let Err(err) = self.persist(&records) {
            records.pop();
            return Err(err);
        }

        debug!(request_id = %record.request_id, "request stored");
        Ok(record)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .find(|record| &record.request_id == id)
            .cloned())
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<Value>, RepositoryError> {
        let records = self.lock()?;
        let documents = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        drop(records);

        let rows = query.execute(&documents);
        debug!(scanned = documents.len(), returned = rows.len(), "request query executed");
        Ok(rows)
    }
}
