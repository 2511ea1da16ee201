//! Publish-stage collaborator
//!
//! Uploads finished archive slices to an S3 destination with the AWS CLI,
//! one slice per work item.

use super::tool::ToolInvoker;
use super::{Publisher, StageError, StageResult, WorkItem};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Uploads `.dar` slices from the archive directory to `s3://bucket/prefix`.
pub struct S3Publisher {
    invoker: ToolInvoker,
    archive_dir: PathBuf,
    destination: String,
    storage_class: String,
    profile: Option<String>,
}

impl S3Publisher {
    /// Create a publisher. `destination` is a full `s3://bucket/prefix`
    /// URL; `storage_class` is passed straight to the CLI (for example
    /// `DEEP_ARCHIVE` or `STANDARD`).
    pub fn new(
        archive_dir: &Path,
        destination: &str,
        storage_class: &str,
        profile: Option<String>,
    ) -> Self {
        Self {
            invoker: ToolInvoker,
            archive_dir: archive_dir.to_path_buf(),
            destination: destination.trim_end_matches('/').to_string(),
            storage_class: storage_class.to_string(),
            profile,
        }
    }
}

#[async_trait]
impl Publisher for S3Publisher {
    async fn preflight(&self) -> StageResult<()> {
        self.invoker.ensure_available("aws")
    }

    /// Every `.dar` slice in the archive directory, sorted by name.
    async fn list_uploads(&self) -> StageResult<Vec<WorkItem>> {
        if !self.archive_dir.is_dir() {
            return Err(StageError::Enumeration(format!(
                "archive directory does not exist: {}",
                self.archive_dir.display()
            )));
        }
        let mut items = Vec::new();
        let entries =
            std::fs::read_dir(&self.archive_dir).map_err(|e| StageError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StageError::Io(e.to_string()))?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "dar") && path.is_file() {
                let bytes = entry
                    .metadata()
                    .map_err(|e| StageError::Io(e.to_string()))?
                    .len();
                let name = entry.file_name().to_string_lossy().into_owned();
                items.push(WorkItem::new(name, bytes));
            }
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        info!(archives = %self.archive_dir.display(), count = items.len(), "enumerated slices to upload");
        Ok(items)
    }

    async fn publish(&self, item: &WorkItem) -> StageResult<()> {
        let local = self.archive_dir.join(&item.id);
        debug!(slice = %item.id, destination = %self.destination, "uploading slice");
        let mut args = vec![
            "s3".to_string(),
            "cp".to_string(),
            local.display().to_string(),
            format!("{}/{}", self.destination, item.id),
            "--storage-class".to_string(),
            self.storage_class.clone(),
        ];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        self.invoker.run("aws", args).await?;
        Ok(())
    }
}
