//! Session-scoped storage for uploaded files.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::UploadError;
use crate::models::UploadConfig;
use crate::utils::{base_name, sanitize_filename};

/// A file written to disk for loading.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    /// Name the user uploaded, used for display and format dispatch.
    pub display_name: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: u64,
    keep_files: bool,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.dir.clone(),
            max_bytes: config.max_bytes,
            keep_files: config.keep_files,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    /// Write `bytes` to `{root}/{session}/{uuid}-{sanitized name}`.
    pub async fn save(
        &self,
        session_id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await?;

        let path = dir.join(format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            sanitize_filename(original_name)
        ));
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size, "upload stored");

        Ok(StoredUpload {
            path,
            display_name: base_name(original_name).to_string(),
            size,
        })
    }

    /// Remove a loaded upload unless `keep_files` is set.
    pub async fn discard(&self, upload: &StoredUpload) {
        if self.keep_files {
            return;
        }
        if let Err(e) = fs::remove_file(&upload.path).await {
            warn!(path = %upload.path.display(), error = %e, "failed to remove upload");
        }
    }

    pub async fn remove_session_dir(&self, session_id: Uuid) {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&dir).await {
            warn!(path = %dir.display(), error = %e, "failed to remove session uploads");
        }
    }
}
