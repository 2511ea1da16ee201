//! Checkpoint document schema
//!
//! One document captures the durable progress of exactly one backup job:
//! which pipeline stage it reached and which individual items are done.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current checkpoint schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Pipeline stage. Advances strictly forward during a run; only an explicit
/// restart may reset it to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No work started yet
    #[default]
    Pending,
    /// Mirroring remote items into local staging
    Fetching,
    /// Creating size-bounded archive volumes
    Packaging,
    /// Uploading volumes to the destination store
    Publishing,
    /// All stages finished
    Done,
}

impl Stage {
    /// The stage that follows this one.
    pub fn next(self) -> Stage {
        match self {
            Stage::Pending => Stage::Fetching,
            Stage::Fetching => Stage::Packaging,
            Stage::Packaging => Stage::Publishing,
            Stage::Publishing => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }

    /// Lowercase label used in logs and item scoping.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Fetching => "fetch",
            Stage::Packaging => "package",
            Stage::Publishing => "publish",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The subset of run configuration that must match for a checkpoint to be
/// reused. Resuming against a different tuple would mark the wrong items as
/// complete, so a mismatch is fatal rather than silently merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Source descriptor (bucket, organization, local folder, ...)
    pub source: String,
    /// Nested path within the source; empty for a whole-source job
    pub path: String,
    /// Destination descriptor
    pub destination: String,
}

impl std::fmt::Display for ConfigSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "source={} path={} destination={}",
            self.source,
            if self.path.is_empty() { "<root>" } else { &self.path },
            self.destination
        )
    }
}

/// Aggregate counters. Cached for fast inspection; recomputable from the
/// item map (counts) and the collaborators' enumerations (bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Totals {
    /// Items discovered so far across all stages
    pub total_items: u64,
    /// Items marked complete
    pub completed_items: u64,
    /// Bytes across all discovered items
    pub total_bytes: u64,
    /// Bytes across completed items
    pub completed_bytes: u64,
}

/// Durable progress record for one backup job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDocument {
    schema_version: String,
    job_id: String,
    source_descriptor: String,
    dest_descriptor: String,
    created_at: i64,
    updated_at: i64,
    stage: Stage,
    /// Item id -> completion flag. Grows only by discovery; cleared only on
    /// explicit restart.
    items: BTreeMap<String, bool>,
    /// Item id -> last failure reason. An id never appears here while its
    /// completion flag is true.
    errors: BTreeMap<String, String>,
    totals: Totals,
    config_snapshot: ConfigSnapshot,
}

impl CheckpointDocument {
    /// Create a fresh document at `Pending` with no items.
    pub fn new(job_id: &str, snapshot: ConfigSnapshot) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            job_id: job_id.to_string(),
            source_descriptor: snapshot.source.clone(),
            dest_descriptor: snapshot.destination.clone(),
            created_at: now,
            updated_at: now,
            stage: Stage::Pending,
            items: BTreeMap::new(),
            errors: BTreeMap::new(),
            totals: Totals::default(),
            config_snapshot: snapshot,
        }
    }

    /// Job identity token this document belongs to.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Schema version the document was written with.
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Creation timestamp (Unix milliseconds), set once.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Last-save timestamp (Unix milliseconds).
    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Refresh `updated_at`. Called by the store on every save.
    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }

    /// Current pipeline stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Advance to the next stage. Forward-only.
    pub fn advance_stage(&mut self) {
        self.stage = self.stage.next();
    }

    /// Per-item completion flags.
    pub fn items(&self) -> &BTreeMap<String, bool> {
        &self.items
    }

    /// Per-item last failure reasons.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Aggregate counters.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Configuration the checkpoint was created under.
    pub fn config_snapshot(&self) -> &ConfigSnapshot {
        &self.config_snapshot
    }

    /// Whether `item_id` is already marked complete.
    pub fn is_complete(&self, item_id: &str) -> bool {
        self.items.get(item_id).copied().unwrap_or(false)
    }

    /// Register a newly seen item. A no-op for anything already known, in
    /// particular for items already complete in a resumed document.
    pub fn discover(&mut self, item_id: &str, byte_size: u64) {
        if self.items.contains_key(item_id) {
            return;
        }
        self.items.insert(item_id.to_string(), false);
        self.totals.total_items += 1;
        self.totals.total_bytes += byte_size;
    }

    /// Mark an item complete, clearing any recorded error for it.
    /// Idempotent: completing an already-complete item changes nothing.
    pub fn mark_complete(&mut self, item_id: &str, byte_size: u64) {
        match self.items.get(item_id) {
            Some(true) => return,
            Some(false) => {}
            None => {
                self.totals.total_items += 1;
                self.totals.total_bytes += byte_size;
            }
        }
        self.items.insert(item_id.to_string(), true);
        self.errors.remove(item_id);
        self.totals.completed_items += 1;
        self.totals.completed_bytes += byte_size;
    }

    /// Record a failure reason for an item. Never downgrades a completed
    /// item and never decrements counters.
    pub fn mark_failed(&mut self, item_id: &str, reason: &str) {
        match self.items.get(item_id) {
            Some(true) => return,
            Some(false) => {}
            None => {
                self.totals.total_items += 1;
                self.items.insert(item_id.to_string(), false);
            }
        }
        self.errors.insert(item_id.to_string(), reason.to_string());
    }

    /// Validate that the persisted schema version is one we understand.
    pub fn validate_schema_version(&self) -> Result<(), String> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(format!(
                "unsupported checkpoint schema version: expected {SCHEMA_VERSION}, found {}",
                self.schema_version
            ));
        }
        Ok(())
    }
}
