//! Backup command definitions and execution

use crate::checkpoint::CheckpointStore;
use crate::identity::JobIdentity;
use crate::pipeline::config::MAX_CONCURRENCY;
use crate::pipeline::{
    FailurePolicy, PipelineConfig, PipelineCoordinator, RetryPolicy, RunSummary, StageSet,
};
use crate::shutdown::CancelToken;
use crate::stage::{DarPackager, GithubFetcher, LocalFetcher, S3Fetcher, S3Publisher};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::status::StatusArgs;
use super::CliError;

/// Parse and validate a concurrency value.
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Resumable cold-storage backups: mirror, pack, publish.
#[derive(Debug, Parser)]
#[command(name = "coldpack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory for checkpoint documents and job locks
    #[arg(long, global = true, default_value = ".coldpack")]
    pub checkpoint_dir: PathBuf,

    /// Item completions between checkpoint saves
    #[arg(long, global = true, default_value_t = 1)]
    pub checkpoint_interval: usize,

    /// Discard any existing progress for this job and start over
    #[arg(long, global = true)]
    pub force_restart: bool,

    /// Keep the finished checkpoint (archived) instead of deleting it
    #[arg(long, global = true)]
    pub retain_checkpoint: bool,

    /// Retries per item before it is recorded as failed
    #[arg(long, global = true, default_value_t = 3)]
    pub max_retries: u32,

    /// Items worked in parallel within a stage
    #[arg(long, global = true, default_value_t = 4, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Stop dispatching new work after the first permanent failure
    #[arg(long, global = true)]
    pub fail_fast: bool,
}

impl Cli {
    /// Coordinator configuration from the global flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            checkpoint_interval: self.checkpoint_interval,
            concurrency: self.concurrency,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            },
            failure_policy: if self.fail_fast {
                FailurePolicy::Halt
            } else {
                FailurePolicy::Continue
            },
            retain_checkpoint: self.retain_checkpoint,
            force_restart: self.force_restart,
        }
    }
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up a folder of an S3 bucket to cold storage
    S3(S3Args),
    /// Back up a GitHub organization's repositories to cold storage
    Github(GithubArgs),
    /// Pack an already-local folder and publish it to cold storage
    Pack(PackArgs),
    /// Show jobs with saved progress
    Status(StatusArgs),
}

/// Staging, archival and upload knobs shared by every backup variant.
#[derive(Debug, Args)]
pub struct PackOptions {
    /// Local working area the source is mirrored into
    #[arg(long, default_value = "staging")]
    pub staging_dir: PathBuf,

    /// Directory archive slices are written into
    #[arg(long, default_value = "archives")]
    pub archive_dir: PathBuf,

    /// Base name for archive files
    #[arg(long, default_value = "backup")]
    pub archive_name: String,

    /// Archive slice size, in dar syntax (for example 1G or 500M)
    #[arg(long, default_value = "1G")]
    pub volume_size: String,

    /// S3 storage class for uploaded slices
    #[arg(long, default_value = "DEEP_ARCHIVE")]
    pub storage_class: String,

    /// Remove staging and archive data after a fully successful run
    #[arg(long)]
    pub cleanup: bool,
}

/// Arguments for `coldpack s3`
#[derive(Debug, Args)]
pub struct S3Args {
    /// Source bucket name
    #[arg(long)]
    pub bucket: String,

    /// Folder (key prefix) within the bucket; omit to back up the whole
    /// bucket
    #[arg(long, default_value = "")]
    pub path: String,

    /// Destination URL, for example s3://vault/cold
    #[arg(long)]
    pub destination: String,

    /// AWS CLI profile to use for both source and destination
    #[arg(long)]
    pub profile: Option<String>,

    #[command(flatten)]
    pub pack: PackOptions,
}

impl S3Args {
    /// Run an S3 backup to completion or interruption.
    pub async fn execute(
        &self,
        cli: &Cli,
        cancel: Arc<CancelToken>,
    ) -> Result<RunSummary, CliError> {
        let identity = JobIdentity::new(
            &format!("s3://{}", self.bucket),
            &self.path,
            &self.destination,
        )?;
        let stages = StageSet {
            fetcher: Box::new(S3Fetcher::new(
                &self.bucket,
                &self.path,
                &self.pack.staging_dir,
                self.profile.clone(),
            )),
            packager: Box::new(packager(&self.pack)),
            publisher: Box::new(publisher(&self.pack, &self.destination, &self.profile)),
        };
        let summary = run_pipeline(cli, identity, stages, cancel).await?;
        finish(&self.pack, &summary)?;
        Ok(summary)
    }
}

/// Arguments for `coldpack github`
#[derive(Debug, Args)]
pub struct GithubArgs {
    /// GitHub organization to mirror
    #[arg(long)]
    pub org: String,

    /// API token with read access to the organization
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Also mirror forked repositories
    #[arg(long)]
    pub include_forks: bool,

    /// Destination URL, for example s3://vault/cold
    #[arg(long)]
    pub destination: String,

    /// AWS CLI profile for the upload
    #[arg(long)]
    pub profile: Option<String>,

    #[command(flatten)]
    pub pack: PackOptions,
}

impl GithubArgs {
    /// Run a GitHub organization backup to completion or interruption.
    pub async fn execute(
        &self,
        cli: &Cli,
        cancel: Arc<CancelToken>,
    ) -> Result<RunSummary, CliError> {
        let identity = JobIdentity::new(
            &format!("github://{}", self.org),
            "",
            &self.destination,
        )?;
        let stages = StageSet {
            fetcher: Box::new(GithubFetcher::new(
                &self.org,
                &self.token,
                self.include_forks,
                &self.pack.staging_dir,
            )),
            packager: Box::new(packager(&self.pack)),
            publisher: Box::new(publisher(&self.pack, &self.destination, &self.profile)),
        };
        let summary = run_pipeline(cli, identity, stages, cancel).await?;
        finish(&self.pack, &summary)?;
        Ok(summary)
    }
}

/// Arguments for `coldpack pack`
#[derive(Debug, Args)]
pub struct PackArgs {
    /// Local folder to archive
    #[arg(long)]
    pub folder: PathBuf,

    /// Destination URL, for example s3://vault/cold
    #[arg(long)]
    pub destination: String,

    /// AWS CLI profile for the upload
    #[arg(long)]
    pub profile: Option<String>,

    #[command(flatten)]
    pub pack: PackOptions,
}

impl PackArgs {
    /// Pack and publish a local folder to completion or interruption.
    ///
    /// The folder itself serves as staging, so the fetch stage only
    /// verifies readability.
    pub async fn execute(
        &self,
        cli: &Cli,
        cancel: Arc<CancelToken>,
    ) -> Result<RunSummary, CliError> {
        let identity = JobIdentity::new(
            &format!("file://{}", self.folder.display()),
            "",
            &self.destination,
        )?;
        let stages = StageSet {
            fetcher: Box::new(LocalFetcher::new(&self.folder)),
            packager: Box::new(DarPackager::new(
                &self.folder,
                &self.pack.archive_dir,
                &self.pack.archive_name,
                &self.pack.volume_size,
            )),
            publisher: Box::new(publisher(&self.pack, &self.destination, &self.profile)),
        };
        let summary = run_pipeline(cli, identity, stages, cancel).await?;
        // Never clean the source folder itself in pack mode
        if self.pack.cleanup && summary.is_success() {
            remove_dir_logged(&self.pack.archive_dir)?;
        }
        Ok(summary)
    }
}

fn packager(pack: &PackOptions) -> DarPackager {
    DarPackager::new(
        &pack.staging_dir,
        &pack.archive_dir,
        &pack.archive_name,
        &pack.volume_size,
    )
}

fn publisher(pack: &PackOptions, destination: &str, profile: &Option<String>) -> S3Publisher {
    S3Publisher::new(
        &pack.archive_dir,
        destination,
        &pack.storage_class,
        profile.clone(),
    )
}

/// Assemble and run the coordinator for one job.
async fn run_pipeline(
    cli: &Cli,
    identity: JobIdentity,
    stages: StageSet,
    cancel: Arc<CancelToken>,
) -> Result<RunSummary, CliError> {
    info!(job_id = identity.token(), "starting run");
    let store = CheckpointStore::new(&cli.checkpoint_dir);
    let coordinator =
        PipelineCoordinator::new(identity, store, cli.pipeline_config(), stages, cancel);
    Ok(coordinator.run().await?)
}

/// Post-run cleanup of the local working areas, only after a fully clean
/// run.
fn finish(pack: &PackOptions, summary: &RunSummary) -> Result<(), CliError> {
    if !pack.cleanup {
        return Ok(());
    }
    if !summary.is_success() {
        warn!("skipping cleanup, run did not finish cleanly");
        return Ok(());
    }
    remove_dir_logged(&pack.staging_dir)?;
    remove_dir_logged(&pack.archive_dir)?;
    Ok(())
}

fn remove_dir_logged(dir: &std::path::Path) -> Result<(), CliError> {
    if dir.exists() {
        info!(dir = %dir.display(), "removing working directory");
        std::fs::remove_dir_all(dir)?;
    }
    Ok(())
}
