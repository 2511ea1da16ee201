//! Checkpoint persistence and progress tracking
//!
//! Durable per-job progress documents with atomic writes, plus the
//! in-memory tracker the coordinator mutates and the advisory lock that
//! keeps two coordinators off the same job.

pub mod document;
pub mod lock;
pub mod progress;
pub mod store;

pub use document::{CheckpointDocument, ConfigSnapshot, Stage, Totals, SCHEMA_VERSION};
pub use lock::{JobLock, LockError};
pub use progress::{scoped_id, ProgressTracker};
pub use store::{CheckpointStore, StoreError};
