//! In-memory progress view over a checkpoint document
//!
//! The tracker owns the document for the duration of a run. All mutation
//! funnels through it (single-writer discipline), and saves take a
//! consistent snapshot so a checkpoint write never observes a half-applied
//! update.

use super::document::{CheckpointDocument, Stage, Totals};
use crate::stage::WorkItem;
use tracing::debug;

/// Mutable progress state for one running job.
#[derive(Debug)]
pub struct ProgressTracker {
    doc: CheckpointDocument,
}

impl ProgressTracker {
    /// Wrap a document (fresh or resumed).
    pub fn new(doc: CheckpointDocument) -> Self {
        Self { doc }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.doc.stage()
    }

    /// Aggregate counters.
    pub fn totals(&self) -> Totals {
        self.doc.totals()
    }

    /// Register a discovered item under a stage-scoped id; a no-op for
    /// items already known, complete or not.
    pub fn discover(&mut self, item_id: &str, byte_size: u64) {
        self.doc.discover(item_id, byte_size);
    }

    /// Record a unit of work as finished.
    pub fn mark_complete(&mut self, item_id: &str, byte_size: u64) {
        debug!(item_id, byte_size, "item complete");
        self.doc.mark_complete(item_id, byte_size);
    }

    /// Record a unit of work as failed with a reason; the item stays
    /// incomplete and eligible for retry on a later run.
    pub fn mark_failed(&mut self, item_id: &str, reason: &str) {
        debug!(item_id, reason, "item failed");
        self.doc.mark_failed(item_id, reason);
    }

    /// Whether an item id is already complete (resume skip check).
    pub fn is_complete(&self, item_id: &str) -> bool {
        self.doc.is_complete(item_id)
    }

    /// Filter an enumeration down to the items still needing work, after
    /// registering every enumerated item. Completed items from a resumed
    /// document are skipped; failed ones come back for retry because their
    /// flag is still false.
    pub fn register_and_pending(&mut self, stage: Stage, items: &[WorkItem]) -> Vec<WorkItem> {
        let mut pending = Vec::new();
        for item in items {
            let scoped = scoped_id(stage, &item.id);
            self.doc.discover(&scoped, item.bytes);
            if !self.doc.is_complete(&scoped) {
                pending.push(item.clone());
            }
        }
        pending
    }

    /// Advance the document to the next stage.
    pub fn advance_stage(&mut self) {
        let next = self.doc.stage().next();
        debug!(from = %self.doc.stage(), to = %next, "stage advance");
        self.doc.advance_stage();
    }

    /// Item ids currently carrying a failure reason.
    pub fn failed_items(&self) -> Vec<(String, String)> {
        self.doc
            .errors()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Borrow the underlying document (for saving or summarizing).
    pub fn document(&self) -> &CheckpointDocument {
        &self.doc
    }

    /// Mutable access for the store's save path.
    pub fn document_mut(&mut self) -> &mut CheckpointDocument {
        &mut self.doc
    }
}

/// Prefix an item id with its stage label so the same natural id can occur
/// in more than one stage without colliding in the item map.
pub fn scoped_id(stage: Stage, item_id: &str) -> String {
    format!("{}/{item_id}", stage.label())
}
