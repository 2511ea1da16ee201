//! Cancellation mid-run: in-flight work finishes, progress is saved

use crate::support::{items, new_log, no_retry_config, ScriptedStage};
use coldpack::checkpoint::CheckpointStore;
use coldpack::pipeline::RunOutcome;
use coldpack::shutdown::CancelToken;
use coldpack::{JobIdentity, PipelineConfig, PipelineCoordinator, Stage, StageSet};
use std::sync::Arc;

#[tokio::test]
async fn test_cancel_during_fetch_saves_progress() {
    let dir = tempfile::TempDir::new().unwrap();
    let cancel = CancelToken::shared();
    let log = new_log();

    // Cancellation arrives while item b is being worked; b itself still
    // finishes
    let fetcher = {
        let cancel = Arc::clone(&cancel);
        ScriptedStage::new("fetch", items(&["a", "b", "c"]), Arc::clone(&log)).on_execute(
            move |item| {
                if item.id == "b" {
                    cancel.cancel();
                }
            },
        )
    };
    let stages = StageSet {
        fetcher: Box::new(fetcher),
        packager: Box::new(ScriptedStage::new("package", items(&["vol"]), Arc::clone(&log))),
        publisher: Box::new(ScriptedStage::new("publish", items(&["vol"]), Arc::clone(&log))),
    };

    let identity = JobIdentity::new("s3://src", "folder", "s3://dst").unwrap();
    let config = PipelineConfig {
        concurrency: 1,
        ..no_retry_config()
    };
    let coordinator = PipelineCoordinator::new(
        identity,
        CheckpointStore::new(dir.path()),
        config,
        stages,
        Arc::clone(&cancel),
    );
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Interrupted);
    assert_eq!(summary.stage, Stage::Fetching);

    // The saved checkpoint reflects everything that finished before the
    // cancellation took effect
    let store = CheckpointStore::new(dir.path());
    let doc = store.load(&summary.job_id).unwrap();
    assert!(doc.is_complete("fetch/a"));
    assert!(doc.is_complete("fetch/b"));
    assert!(!doc.is_complete("fetch/c"));

    // The later stages never started
    let executed = log.lock().unwrap().clone();
    assert!(executed.iter().all(|e| e.starts_with("fetch/")));
}

#[tokio::test]
async fn test_resume_after_cancellation_finishes_the_job() {
    let dir = tempfile::TempDir::new().unwrap();
    let identity = JobIdentity::new("s3://src", "folder", "s3://dst").unwrap();

    // First run, cancelled after the first item
    let cancel = CancelToken::shared();
    let log = new_log();
    let fetcher = {
        let cancel = Arc::clone(&cancel);
        ScriptedStage::new("fetch", items(&["a", "b"]), Arc::clone(&log)).on_execute(move |_| {
            cancel.cancel();
        })
    };
    let stages = StageSet {
        fetcher: Box::new(fetcher),
        packager: Box::new(ScriptedStage::new("package", items(&["vol"]), Arc::clone(&log))),
        publisher: Box::new(ScriptedStage::new("publish", items(&["vol"]), Arc::clone(&log))),
    };
    let config = PipelineConfig {
        concurrency: 1,
        ..no_retry_config()
    };
    let first = PipelineCoordinator::new(
        identity.clone(),
        CheckpointStore::new(dir.path()),
        config.clone(),
        stages,
        Arc::clone(&cancel),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(first.outcome, RunOutcome::Interrupted);

    // Second run picks up and completes
    let log = new_log();
    let stages = StageSet {
        fetcher: Box::new(ScriptedStage::new("fetch", items(&["a", "b"]), Arc::clone(&log))),
        packager: Box::new(ScriptedStage::new("package", items(&["vol"]), Arc::clone(&log))),
        publisher: Box::new(ScriptedStage::new("publish", items(&["vol"]), Arc::clone(&log))),
    };
    let second = PipelineCoordinator::new(
        identity,
        CheckpointStore::new(dir.path()),
        config,
        stages,
        CancelToken::shared(),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(second.stage, Stage::Done);
}
