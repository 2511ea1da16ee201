//! # coldpack
//!
//! Resumable, checkpoint-driven backups to cold storage. A backup is a
//! three-stage pipeline: **fetch** mirrors the source (an S3 folder, a
//! GitHub organization, or a local directory) into a staging area,
//! **package** turns staging into size-bounded archive slices, and
//! **publish** uploads the slices to the destination. Progress is recorded
//! per item in a durable checkpoint, so an interrupted or partially failed
//! run picks up where it left off instead of starting over.
//!
//! ## Quick Start
//!
//! ```no_run
//! use coldpack::checkpoint::CheckpointStore;
//! use coldpack::pipeline::{PipelineConfig, PipelineCoordinator, StageSet};
//! use coldpack::shutdown::CancelToken;
//! use coldpack::stage::{DarPackager, S3Fetcher, S3Publisher};
//! use coldpack::JobIdentity;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = JobIdentity::new("s3://studies-db-prod", "Bermuda", "s3://vault/cold")?;
//! let stages = StageSet {
//!     fetcher: Box::new(S3Fetcher::new("studies-db-prod", "Bermuda", Path::new("staging"), None)),
//!     packager: Box::new(DarPackager::new(
//!         Path::new("staging"), Path::new("archives"), "backup", "1G",
//!     )),
//!     publisher: Box::new(S3Publisher::new(
//!         Path::new("archives"), "s3://vault/cold", "DEEP_ARCHIVE", None,
//!     )),
//! };
//! let coordinator = PipelineCoordinator::new(
//!     identity,
//!     CheckpointStore::new(".coldpack"),
//!     PipelineConfig::default(),
//!     stages,
//!     CancelToken::shared(),
//! );
//! let summary = coordinator.run().await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identity`] - stable job ids derived from the (source, path,
//!   destination) tuple
//! - [`checkpoint`] - durable per-item progress with atomic saves and
//!   advisory job locking
//! - [`stage`] - the collaborator traits and their AWS CLI, GitHub API and
//!   dar implementations
//! - [`pipeline`] - the coordinator: stage sequencing, retries, resume
//!   policy, run summaries
//! - [`shutdown`] - cancellation signaling between the signal handler and
//!   the coordinator

pub mod checkpoint;
pub mod cli;
pub mod identity;
pub mod pipeline;
pub mod shutdown;
pub mod stage;

pub use checkpoint::{CheckpointDocument, CheckpointStore, Stage};
pub use identity::JobIdentity;
pub use pipeline::{
    PipelineConfig, PipelineCoordinator, PipelineError, RunOutcome, RunSummary, StageSet,
};
pub use shutdown::CancelToken;
