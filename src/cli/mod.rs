//! CLI command implementations

pub mod backup;
pub mod error;
pub mod status;

pub use backup::{Cli, Commands, GithubArgs, PackArgs, PackOptions, S3Args};
pub use error::CliError;
pub use status::StatusArgs;
