//! Shared test collaborators for pipeline tests

use async_trait::async_trait;
use coldpack::pipeline::{PipelineConfig, RetryPolicy};
use coldpack::stage::{Fetcher, Packager, Publisher, StageError, StageResult, WorkItem};
use coldpack::StageSet;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Shared record of executed item ids, in completion order.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

type ExecuteHook = Box<dyn Fn(&WorkItem) + Send + Sync>;

/// Scripted collaborator: serves a canned item list, fails configured ids
/// on every attempt, and records each execution. One instance stands in
/// for whichever stage it is plugged into.
pub struct ScriptedStage {
    label: &'static str,
    items: Vec<WorkItem>,
    failing: HashSet<String>,
    log: ExecutionLog,
    on_execute: Option<ExecuteHook>,
}

impl ScriptedStage {
    pub fn new(label: &'static str, items: Vec<WorkItem>, log: ExecutionLog) -> Self {
        Self {
            label,
            items,
            failing: HashSet::new(),
            log,
            on_execute: None,
        }
    }

    /// Make the given ids fail on every attempt.
    pub fn failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Run a hook on every execution, before the failure check.
    pub fn on_execute<F>(mut self, hook: F) -> Self
    where
        F: Fn(&WorkItem) + Send + Sync + 'static,
    {
        self.on_execute = Some(Box::new(hook));
        self
    }

    fn execute(&self, item: &WorkItem) -> StageResult<()> {
        if let Some(hook) = &self.on_execute {
            hook(item);
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("{}/{}", self.label, item.id));
        if self.failing.contains(&item.id) {
            return Err(StageError::Io(format!("scripted failure for {}", item.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for ScriptedStage {
    async fn list_items(&self) -> StageResult<Vec<WorkItem>> {
        Ok(self.items.clone())
    }
    async fn fetch_item(&self, item: &WorkItem) -> StageResult<()> {
        self.execute(item)
    }
}

#[async_trait]
impl Packager for ScriptedStage {
    async fn list_volumes(&self) -> StageResult<Vec<WorkItem>> {
        Ok(self.items.clone())
    }
    async fn create_volume(&self, item: &WorkItem) -> StageResult<()> {
        self.execute(item)
    }
}

#[async_trait]
impl Publisher for ScriptedStage {
    async fn list_uploads(&self) -> StageResult<Vec<WorkItem>> {
        Ok(self.items.clone())
    }
    async fn publish(&self, item: &WorkItem) -> StageResult<()> {
        self.execute(item)
    }
}

/// Stage set serving `items` in every stage, with a shared execution log.
pub fn scripted_set(items: &[WorkItem], log: &ExecutionLog) -> StageSet {
    StageSet {
        fetcher: Box::new(ScriptedStage::new("fetch", items.to_vec(), Arc::clone(log))),
        packager: Box::new(ScriptedStage::new(
            "package",
            items.to_vec(),
            Arc::clone(log),
        )),
        publisher: Box::new(ScriptedStage::new(
            "publish",
            items.to_vec(),
            Arc::clone(log),
        )),
    }
}

pub fn items(ids: &[&str]) -> Vec<WorkItem> {
    ids.iter().map(|id| WorkItem::new(*id, 1)).collect()
}

pub fn new_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Config with retries disabled so failure tests finish quickly.
pub fn no_retry_config() -> PipelineConfig {
    PipelineConfig {
        retry: RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        },
        ..PipelineConfig::default()
    }
}
