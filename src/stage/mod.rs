//! External collaborator seam
//!
//! The coordinator never performs bulk transfer or archival itself; it
//! drives these capability traits. Each stage exposes an enumeration of
//! work units and a per-unit operation whose only contract is
//! success / failure-with-reason.

use async_trait::async_trait;

pub mod fetch;
pub mod package;
pub mod publish;
pub mod tool;

pub use fetch::{GithubFetcher, LocalFetcher, S3Fetcher};
pub use package::DarPackager;
pub use publish::S3Publisher;
pub use tool::ToolInvoker;

/// Stage collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A required external binary is missing from PATH
    #[error("required tool '{0}' not found on PATH")]
    ToolMissing(String),

    /// An external tool exited with a failure status
    #[error("{program} failed ({status}): {stderr}")]
    ToolFailed {
        /// Program that was invoked
        program: String,
        /// Exit status description
        status: String,
        /// Captured stderr (trimmed)
        stderr: String,
    },

    /// Enumeration of work units failed
    #[error("enumeration failed: {0}")]
    Enumeration(String),

    /// Remote API error during enumeration
    #[error("API error: {0}")]
    Api(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for collaborator operations
pub type StageResult<T> = Result<T, StageError>;

/// One resumable unit of work: a file to mirror, an archive to create, or a
/// volume to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Stable identifier within its stage (relative path, repo name,
    /// volume file name)
    pub id: String,
    /// Size in bytes, when the enumeration knows it (0 otherwise)
    pub bytes: u64,
}

impl WorkItem {
    /// Convenience constructor.
    pub fn new<S: Into<String>>(id: S, bytes: u64) -> Self {
        Self {
            id: id.into(),
            bytes,
        }
    }
}

/// Mirrors remote items into a local staging area.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Verify external prerequisites before any work is attempted.
    async fn preflight(&self) -> StageResult<()> {
        Ok(())
    }

    /// Enumerate the items available at the source.
    async fn list_items(&self) -> StageResult<Vec<WorkItem>>;

    /// Mirror a single item into staging.
    async fn fetch_item(&self, item: &WorkItem) -> StageResult<()>;
}

/// Packs the staging area into size-bounded archive volumes.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Verify external prerequisites before any work is attempted.
    async fn preflight(&self) -> StageResult<()> {
        Ok(())
    }

    /// Enumerate the archives to create from staging.
    async fn list_volumes(&self) -> StageResult<Vec<WorkItem>>;

    /// Create one archive (all of its volume slices).
    async fn create_volume(&self, item: &WorkItem) -> StageResult<()>;
}

/// Uploads archive volumes to the destination store.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Verify external prerequisites before any work is attempted.
    async fn preflight(&self) -> StageResult<()> {
        Ok(())
    }

    /// Enumerate the local volumes awaiting upload.
    async fn list_uploads(&self) -> StageResult<Vec<WorkItem>>;

    /// Upload one volume.
    async fn publish(&self, item: &WorkItem) -> StageResult<()>;
}
