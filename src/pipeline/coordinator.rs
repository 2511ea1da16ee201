//! Stage-sequencing coordinator
//!
//! Owns one run of one job: takes the job lock, decides resume vs restart,
//! then walks the stage sequence. Within a stage, items run on a bounded
//! worker pool while all progress mutation stays on the driver loop, so a
//! checkpoint save always sees a consistent document.

use super::config::{FailurePolicy, PipelineConfig, RetryPolicy};
use super::resume;
use super::summary::{RunOutcome, RunSummary};
use super::PipelineError;
use crate::checkpoint::{scoped_id, CheckpointStore, JobLock, ProgressTracker, Stage};
use crate::identity::JobIdentity;
use crate::shutdown::CancelToken;
use crate::stage::{Fetcher, Packager, Publisher, StageResult, WorkItem};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The three collaborators a run drives.
pub struct StageSet {
    /// Mirrors source items into staging
    pub fetcher: Box<dyn Fetcher>,
    /// Packs staging into archive volumes
    pub packager: Box<dyn Packager>,
    /// Uploads volumes to the destination
    pub publisher: Box<dyn Publisher>,
}

/// Stage-indexed view over a [`StageSet`].
enum StageOps<'a> {
    Fetch(&'a dyn Fetcher),
    Package(&'a dyn Packager),
    Publish(&'a dyn Publisher),
}

impl<'a> StageOps<'a> {
    fn for_stage(stages: &'a StageSet, stage: Stage) -> Option<Self> {
        match stage {
            Stage::Fetching => Some(Self::Fetch(stages.fetcher.as_ref())),
            Stage::Packaging => Some(Self::Package(stages.packager.as_ref())),
            Stage::Publishing => Some(Self::Publish(stages.publisher.as_ref())),
            Stage::Pending | Stage::Done => None,
        }
    }

    async fn list(&self) -> StageResult<Vec<WorkItem>> {
        match self {
            Self::Fetch(f) => f.list_items().await,
            Self::Package(p) => p.list_volumes().await,
            Self::Publish(p) => p.list_uploads().await,
        }
    }

    async fn execute(&self, item: &WorkItem) -> StageResult<()> {
        match self {
            Self::Fetch(f) => f.fetch_item(item).await,
            Self::Package(p) => p.create_volume(item).await,
            Self::Publish(p) => p.publish(item).await,
        }
    }
}

/// Result of working one item, including its retries.
enum ItemOutcome {
    Done,
    Failed(String),
    /// Cancelled or halted before the first attempt; the item stays untouched
    Skipped,
}

/// Drives one job through fetch, package and publish.
pub struct PipelineCoordinator {
    identity: JobIdentity,
    store: CheckpointStore,
    config: PipelineConfig,
    stages: StageSet,
    cancel: Arc<CancelToken>,
}

impl PipelineCoordinator {
    /// Assemble a coordinator. Out-of-range config knobs are clamped.
    pub fn new(
        identity: JobIdentity,
        store: CheckpointStore,
        config: PipelineConfig,
        stages: StageSet,
        cancel: Arc<CancelToken>,
    ) -> Self {
        Self {
            identity,
            store,
            config: config.normalized(),
            stages,
            cancel,
        }
    }

    /// Run the job to completion, cancellation, or its first unrecoverable
    /// stop, and report what happened.
    ///
    /// Per-item failures are not errors here; they are carried in the
    /// summary. The error path is reserved for conditions where no work
    /// can responsibly start or continue.
    pub async fn run(self) -> Result<RunSummary, PipelineError> {
        let Self {
            identity,
            store,
            config,
            stages,
            cancel,
        } = self;
        let job_id = identity.token().to_string();
        let started = Instant::now();

        let lock = JobLock::try_acquire(store.dir(), &job_id)?;

        let (doc, _decision) = resume::open_document(&store, &identity, config.force_restart)?;
        let mut tracker = ProgressTracker::new(doc);

        stages.fetcher.preflight().await?;
        stages.packager.preflight().await?;
        stages.publisher.preflight().await?;

        // The first save must succeed; without it no progress is durable.
        store.save(tracker.document_mut())?;

        let mut degraded = false;
        let mut halted = false;

        loop {
            if cancel.is_cancelled() || halted {
                break;
            }
            let stage = tracker.stage();
            if stage == Stage::Pending {
                tracker.advance_stage();
                save_soft(&store, &mut tracker, &mut degraded);
                continue;
            }
            let ops = match StageOps::for_stage(&stages, stage) {
                Some(ops) => ops,
                None => break,
            };

            let items = ops.list().await?;
            let pending = tracker.register_and_pending(stage, &items);
            info!(
                job_id,
                stage = %stage,
                enumerated = items.len(),
                pending = pending.len(),
                "stage starting"
            );

            let failures = run_stage_items(
                &ops,
                stage,
                pending,
                &config,
                &cancel,
                &store,
                &mut tracker,
                &mut degraded,
                &mut halted,
            )
            .await;

            if halted || cancel.is_cancelled() {
                break;
            }
            if failures > 0 {
                warn!(
                    job_id,
                    stage = %stage,
                    failures,
                    "stage completed with errors, proceeding"
                );
            }
            tracker.advance_stage();
            save_soft(&store, &mut tracker, &mut degraded);
        }

        save_soft(&store, &mut tracker, &mut degraded);

        let stage = tracker.stage();
        let failed = tracker.failed_items();
        let outcome = if cancel.is_cancelled() && stage != Stage::Done {
            info!(job_id, stage = %stage, "run interrupted, progress saved");
            RunOutcome::Interrupted
        } else if halted {
            RunOutcome::Halted(stage)
        } else {
            // The job reached DONE; the checkpoint has served its purpose
            if config.retain_checkpoint {
                if let Err(e) = store.archive(&job_id) {
                    warn!(job_id, error = %e, "failed to archive finished checkpoint");
                }
            } else if let Err(e) = store.delete(&job_id) {
                warn!(job_id, error = %e, "failed to remove finished checkpoint");
            }
            if let Err(e) = lock.dispose() {
                warn!(job_id, error = %e, "failed to remove job lock file");
            }
            if failed.is_empty() {
                RunOutcome::Completed
            } else {
                RunOutcome::CompletedWithErrors
            }
        };

        Ok(RunSummary {
            job_id,
            outcome,
            stage,
            totals: tracker.totals(),
            failed,
            duration: started.elapsed(),
            checkpoint_degraded: degraded,
        })
    }
}

/// Work the pending items of one stage on a bounded pool; returns the
/// number of permanent failures. All tracker mutation happens here on the
/// driver side of the stream.
#[allow(clippy::too_many_arguments)]
async fn run_stage_items(
    ops: &StageOps<'_>,
    stage: Stage,
    pending: Vec<WorkItem>,
    config: &PipelineConfig,
    cancel: &Arc<CancelToken>,
    store: &CheckpointStore,
    tracker: &mut ProgressTracker,
    degraded: &mut bool,
    halted: &mut bool,
) -> usize {
    let mut failures = 0;
    let mut dirty = 0usize;

    // Set on the first permanent failure under Halt policy. Undispatched
    // items then skip instead of executing, and the driver keeps draining
    // so in-flight completions still get recorded.
    let stop_dispatch = Arc::new(AtomicBool::new(false));
    {
        let mut results = stream::iter(pending.into_iter().map(|item| {
            let cancel = Arc::clone(cancel);
            let stop_dispatch = Arc::clone(&stop_dispatch);
            async move {
                let outcome = if stop_dispatch.load(Ordering::SeqCst) {
                    ItemOutcome::Skipped
                } else {
                    execute_with_retry(ops, &item, &config.retry, &cancel).await
                };
                (item, outcome)
            }
        }))
        .buffer_unordered(config.concurrency);

        while let Some((item, outcome)) = results.next().await {
            let scoped = scoped_id(stage, &item.id);
            match outcome {
                ItemOutcome::Done => {
                    tracker.mark_complete(&scoped, item.bytes);
                    dirty += 1;
                }
                ItemOutcome::Failed(reason) => {
                    error!(stage = %stage, item = %item.id, reason, "item failed permanently");
                    tracker.mark_failed(&scoped, &reason);
                    failures += 1;
                    dirty += 1;
                    if config.failure_policy == FailurePolicy::Halt {
                        *halted = true;
                        stop_dispatch.store(true, Ordering::SeqCst);
                    }
                }
                ItemOutcome::Skipped => {}
            }
            if dirty >= config.checkpoint_interval {
                save_soft(store, tracker, degraded);
                dirty = 0;
            }
        }
    }

    if dirty > 0 {
        save_soft(store, tracker, degraded);
    }
    failures
}

/// One item through its attempts, with capped exponential backoff between
/// them. Cancellation during a backoff wait keeps the last failure reason.
async fn execute_with_retry(
    ops: &StageOps<'_>,
    item: &WorkItem,
    retry: &RetryPolicy,
    cancel: &CancelToken,
) -> ItemOutcome {
    if cancel.is_cancelled() {
        return ItemOutcome::Skipped;
    }
    let mut attempt = 0u32;
    loop {
        match ops.execute(item).await {
            Ok(()) => return ItemOutcome::Done,
            Err(e) => {
                if attempt >= retry.max_retries {
                    return ItemOutcome::Failed(e.to_string());
                }
                attempt += 1;
                let delay = retry.backoff_for(attempt);
                warn!(
                    item = %item.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "item attempt failed, retrying"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return ItemOutcome::Failed(e.to_string()),
                }
            }
        }
    }
}

/// Save the checkpoint, downgrading failure to a warning. A missed save
/// only means progress since the last good save would be repeated.
fn save_soft(store: &CheckpointStore, tracker: &mut ProgressTracker, degraded: &mut bool) {
    if let Err(e) = store.save(tracker.document_mut()) {
        warn!(error = %e, "checkpoint save failed, recent progress is not durable");
        *degraded = true;
    }
}
