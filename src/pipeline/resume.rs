//! Resume-or-restart decision
//!
//! Exactly one rule set decides what happens to an existing checkpoint
//! before any work starts, in priority order: an explicit restart wins,
//! then missing/corrupt documents fall back to a fresh start, then a
//! configuration mismatch aborts, and only a matching document is resumed.

use super::PipelineError;
use crate::checkpoint::{CheckpointDocument, CheckpointStore, ConfigSnapshot, StoreError};
use crate::identity::JobIdentity;
use tracing::{info, warn};

/// Whether the run starts from scratch or picks up saved progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// No usable prior progress; a fresh document was created
    Fresh,
    /// A matching checkpoint was loaded and will be continued
    Resumed,
}

/// Produce the document this run will work on.
///
/// # Errors
///
/// `ConfigMismatch` when a checkpoint exists for this job id but was
/// created under a different (source, path, destination) tuple; store
/// errors other than not-found/corrupt are passed through.
pub fn open_document(
    store: &CheckpointStore,
    identity: &JobIdentity,
    force_restart: bool,
) -> Result<(CheckpointDocument, ResumeDecision), PipelineError> {
    let snapshot = ConfigSnapshot {
        source: identity.source().to_string(),
        path: identity.path().to_string(),
        destination: identity.destination().to_string(),
    };
    let job_id = identity.token();

    if force_restart {
        info!(job_id, "restart requested, discarding any existing progress");
        return Ok((CheckpointDocument::new(job_id, snapshot), ResumeDecision::Fresh));
    }

    match store.load(job_id) {
        Ok(doc) => {
            if doc.config_snapshot() != &snapshot {
                return Err(PipelineError::ConfigMismatch {
                    existing: doc.config_snapshot().to_string(),
                    current: snapshot.to_string(),
                });
            }
            info!(
                job_id,
                stage = %doc.stage(),
                completed = doc.totals().completed_items,
                total = doc.totals().total_items,
                "resuming from checkpoint"
            );
            Ok((doc, ResumeDecision::Resumed))
        }
        Err(StoreError::NotFound(_)) => {
            info!(job_id, "no checkpoint found, starting fresh");
            Ok((CheckpointDocument::new(job_id, snapshot), ResumeDecision::Fresh))
        }
        Err(StoreError::Corrupt { reason, .. }) => {
            warn!(job_id, reason, "checkpoint unreadable, starting fresh");
            Ok((CheckpointDocument::new(job_id, snapshot), ResumeDecision::Fresh))
        }
        Err(e) => Err(e.into()),
    }
}
