//! Pipeline coordination
//!
//! The coordinator drives the fetch, package and publish collaborators
//! through the stage sequence, persisting per-item progress so an
//! interrupted run picks up where it left off.

pub mod config;
pub mod coordinator;
pub mod resume;
pub mod summary;

pub use config::{FailurePolicy, PipelineConfig, RetryPolicy};
pub use coordinator::{PipelineCoordinator, StageSet};
pub use resume::{open_document, ResumeDecision};
pub use summary::{RunOutcome, RunSummary};

use crate::checkpoint::{LockError, StoreError};
use crate::identity::IdentityError;
use crate::stage::StageError;

/// Errors that abort a run before or instead of doing work. Per-item
/// failures are not errors; they land in the run summary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Another process holds the lock for this job
    #[error(transparent)]
    AlreadyRunning(#[from] LockError),

    /// A checkpoint exists for this job id but was created under a
    /// different configuration
    #[error("checkpoint configuration mismatch: checkpoint has [{existing}], run has [{current}]; use --force-restart to discard it")]
    ConfigMismatch {
        /// Snapshot recorded in the checkpoint
        existing: String,
        /// Snapshot of the current invocation
        current: String,
    },

    /// The job identity could not be derived
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Checkpoint persistence failed fatally
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A collaborator failed before per-item work began (preflight or
    /// enumeration)
    #[error(transparent)]
    Stage(#[from] StageError),
}
