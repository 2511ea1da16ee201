//! Durable checkpoint persistence
//!
//! One JSON document per job id under a configurable directory. Saves are
//! atomic (temp file + rename + fsync) so a crash mid-write never leaves a
//! half-written checkpoint visible to a later load.

use super::document::CheckpointDocument;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extension for checkpoint documents
const CHECKPOINT_EXT: &str = "json";

/// Subdirectory that archived (retained) checkpoints move into on success
const COMPLETED_DIR: &str = "completed";

/// Maximum allowed checkpoint file size (10 MB) to prevent memory exhaustion
pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024;

/// Errors raised by the checkpoint store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No checkpoint exists for the requested job
    #[error("no checkpoint found for job {0}")]
    NotFound(String),

    /// A checkpoint exists but cannot be parsed into the schema
    #[error("corrupt checkpoint for job {job_id}: {reason}")]
    Corrupt {
        /// Job the document belongs to
        job_id: String,
        /// Parse or validation failure detail
        reason: String,
    },

    /// The checkpoint could not be written durably
    #[error("failed to persist checkpoint: {0}")]
    PersistenceFailure(String),

    /// Other I/O failure while reading or removing a checkpoint
    #[error("checkpoint IO error: {0}")]
    Io(String),
}

/// Checkpoint store over a directory of `<job_id>.json` files.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for a job id.
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(format!("{job_id}.{CHECKPOINT_EXT}"))
    }

    /// Load the checkpoint for `job_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no file exists; `Corrupt` if the file cannot be parsed
    /// into the schema or carries an unknown schema version. The caller
    /// decides whether corruption is fatal or a fresh-start condition.
    pub fn load(&self, job_id: &str) -> Result<CheckpointDocument, StoreError> {
        let path = self.path_for(job_id);
        if !path.exists() {
            debug!(job_id, "no checkpoint on disk");
            return Err(StoreError::NotFound(job_id.to_string()));
        }

        let metadata = std::fs::metadata(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        if metadata.len() > MAX_DOCUMENT_SIZE {
            return Err(StoreError::Corrupt {
                job_id: job_id.to_string(),
                reason: format!(
                    "document is {} bytes (max {MAX_DOCUMENT_SIZE})",
                    metadata.len()
                ),
            });
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;

        let doc: CheckpointDocument = serde_json::from_str(&contents).map_err(|e| {
            warn!(job_id, error = %e, "failed to deserialize checkpoint");
            StoreError::Corrupt {
                job_id: job_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        doc.validate_schema_version().map_err(|reason| StoreError::Corrupt {
            job_id: job_id.to_string(),
            reason,
        })?;

        info!(
            job_id,
            stage = %doc.stage(),
            items = doc.items().len(),
            "checkpoint loaded"
        );
        Ok(doc)
    }

    /// Persist the document atomically, refreshing its `updated_at`.
    ///
    /// The document is serialized to a temp file in the same directory,
    /// flushed and fsynced, then renamed over the target; the parent
    /// directory is fsynced so the rename itself is durable.
    pub fn save(&self, doc: &mut CheckpointDocument) -> Result<(), StoreError> {
        doc.touch();
        let path = self.path_for(doc.job_id());

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::PersistenceFailure(e.to_string()))?;

        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::PersistenceFailure(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| StoreError::PersistenceFailure(format!("create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StoreError::PersistenceFailure(format!("write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StoreError::PersistenceFailure(format!("flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StoreError::PersistenceFailure(format!("sync temp file: {e}")))?;

        temp_file
            .persist(&path)
            .map_err(|e| StoreError::PersistenceFailure(format!("persist temp file: {e}")))?;

        if let Ok(dir) = std::fs::File::open(&self.dir) {
            let _ = dir.sync_all();
        }

        debug!(
            job_id = doc.job_id(),
            stage = %doc.stage(),
            completed = doc.totals().completed_items,
            total = doc.totals().total_items,
            "checkpoint saved"
        );
        Ok(())
    }

    /// Remove the checkpoint for a finished job. Idempotent: a missing file
    /// is a no-op.
    pub fn delete(&self, job_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(job_id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(job_id, "checkpoint deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    /// Move the checkpoint into the `completed/` namespace instead of
    /// deleting it (checkpoint retention). Idempotent on a missing source.
    pub fn archive(&self, job_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(job_id);
        if !path.exists() {
            return Ok(());
        }
        let completed = self.dir.join(COMPLETED_DIR);
        std::fs::create_dir_all(&completed).map_err(|e| StoreError::Io(e.to_string()))?;
        let target = completed.join(format!("{job_id}.{CHECKPOINT_EXT}"));
        std::fs::rename(&path, &target).map_err(|e| StoreError::Io(e.to_string()))?;
        info!(job_id, target = %target.display(), "checkpoint archived");
        Ok(())
    }

    /// Job ids with a checkpoint currently on disk (in-progress jobs only,
    /// not the completed archive).
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == CHECKPOINT_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
