//! CLI error types and conversions

use crate::checkpoint::StoreError;
use crate::identity::IdentityError;
use crate::pipeline::PipelineError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Run aborted before or during coordination
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Job identity could not be derived from the arguments
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Checkpoint store access failed
    #[error("checkpoint error: {0}")]
    Store(#[from] StoreError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
