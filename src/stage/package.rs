//! Package-stage collaborator
//!
//! Turns the staging area into size-bounded `dar` archive slices, one
//! archive per top-level staging entry so a resumed run re-packs only what
//! failed.

use super::tool::ToolInvoker;
use super::{Packager, StageError, StageResult, WorkItem};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Creates multi-slice archives with the `dar` disk archiver.
pub struct DarPackager {
    invoker: ToolInvoker,
    staging_dir: PathBuf,
    archive_dir: PathBuf,
    base_name: String,
    slice_size: String,
}

impl DarPackager {
    /// Create a packager reading from `staging_dir` and writing archive
    /// slices named `<base_name>-<entry>.*.dar` into `archive_dir`.
    /// `slice_size` uses dar's size syntax (for example `1G` or `500M`).
    pub fn new(staging_dir: &Path, archive_dir: &Path, base_name: &str, slice_size: &str) -> Self {
        Self {
            invoker: ToolInvoker,
            staging_dir: staging_dir.to_path_buf(),
            archive_dir: archive_dir.to_path_buf(),
            base_name: base_name.to_string(),
            slice_size: slice_size.to_string(),
        }
    }

    fn archive_base(&self, entry: &str) -> PathBuf {
        self.archive_dir.join(format!("{}-{entry}", self.base_name))
    }
}

#[async_trait]
impl Packager for DarPackager {
    async fn preflight(&self) -> StageResult<()> {
        self.invoker.ensure_available("dar")
    }

    /// One work item per top-level staging entry; bytes are the entry's
    /// uncompressed size.
    async fn list_volumes(&self) -> StageResult<Vec<WorkItem>> {
        if !self.staging_dir.is_dir() {
            return Err(StageError::Enumeration(format!(
                "staging directory does not exist: {}",
                self.staging_dir.display()
            )));
        }
        let mut items = Vec::new();
        let entries =
            std::fs::read_dir(&self.staging_dir).map_err(|e| StageError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StageError::Io(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let bytes = entry_size(&entry.path())?;
            items.push(WorkItem::new(name, bytes));
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        info!(staging = %self.staging_dir.display(), count = items.len(), "enumerated archives to create");
        Ok(items)
    }

    /// Run dar over one staging entry. `-w` overwrites slices left behind by
    /// an interrupted earlier attempt, which is what makes re-running this
    /// item safe.
    async fn create_volume(&self, item: &WorkItem) -> StageResult<()> {
        std::fs::create_dir_all(&self.archive_dir).map_err(|e| StageError::Io(e.to_string()))?;
        let source = self.staging_dir.join(&item.id);
        let base = self.archive_base(&item.id);
        debug!(entry = %item.id, base = %base.display(), "creating archive");

        let mut args = vec![
            "-w".to_string(),
            "-s".to_string(),
            self.slice_size.clone(),
            "-c".to_string(),
            base.display().to_string(),
        ];
        if source.is_dir() {
            args.push("-R".to_string());
            args.push(source.display().to_string());
        } else {
            // Single file: root the archive at staging and include just it
            args.push("-R".to_string());
            args.push(self.staging_dir.display().to_string());
            args.push("-g".to_string());
            args.push(item.id.clone());
        }
        self.invoker.run("dar", args).await?;
        Ok(())
    }
}

/// Recursive on-disk size of a file or directory.
fn entry_size(path: &Path) -> StageResult<u64> {
    let meta = std::fs::metadata(path).map_err(|e| StageError::Io(e.to_string()))?;
    if meta.is_file() {
        return Ok(meta.len());
    }
    let mut total = 0;
    let entries = std::fs::read_dir(path).map_err(|e| StageError::Io(e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| StageError::Io(e.to_string()))?;
        total += entry_size(&entry.path())?;
    }
    Ok(total)
}
