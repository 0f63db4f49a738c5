use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::AttachmentUpload;

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("attachment file name '{0}' is not usable")]
    InvalidName(String),
    #[error("attachment content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write attachment {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Writes uploaded attachments under a unique per-upload directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Decode and write `upload` to `<root>/<uuid>_<YYYYMMDD>/<file_name>`.
    pub async fn save(
        &self,
        upload: &AttachmentUpload,
        today: NaiveDate,
    ) -> Result<PathBuf, AttachmentError> {
        let file_name = sanitize_file_name(&upload.file_name)
            .ok_or_else(|| AttachmentError::InvalidName(upload.file_name.clone()))?;
        let bytes = STANDARD.decode(upload.content.trim())?;

        let directory = self
            .root
            .join(format!("{}_{}", Uuid::new_v4(), today.format("%Y%m%d")));
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|source| AttachmentError::Io {
                path: directory.clone(),
                source,
            })?;

        let path = directory.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| AttachmentError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), bytes = bytes.len(), "attachment saved");
        Ok(path)
    }

    /// Remove the per-upload directory holding `path`; paths outside the root are ignored.
    pub async fn discard(&self, path: &Path) {
        let Some(directory) = path.parent() else {
            return;
        };
        if directory == self.root.as_path() || !directory.starts_with(&self.root) {
            return;
        }

        match tokio::fs::remove_dir_all(directory).await {
            Ok(()) => debug!(path = %directory.display(), "attachment discarded"),
            Err(err) => warn!(
                path = %directory.display(),
                error = %err,
                "failed to discard attachment"
            ),
        }
    }
}

/// Keep only the final path component so uploads cannot escape their directory.
pub fn sanitize_file_name(raw: &str) -> Option<&str> {
    let name = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .unwrap_or_default();

    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}
