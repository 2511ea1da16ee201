//! Run configuration and retry policy

use std::time::Duration;

/// Default number of retries per item before it is recorded as failed
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First retry delay
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Upper bound on the exponential retry delay
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Default number of item completions between checkpoint saves
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 1;

/// Default number of items worked in parallel within a stage
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Hard ceiling on per-stage parallelism
pub const MAX_CONCURRENCY: usize = 32;

/// Per-item retry behavior: exponential backoff, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Delay ceiling
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): initial * 2^(n-1),
    /// capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// What the coordinator does when an item exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep working the remaining items
    #[default]
    Continue,
    /// Stop dispatching new work after the first permanent failure
    Halt,
}

/// Coordinator knobs for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Item completions between checkpoint saves (minimum 1)
    pub checkpoint_interval: usize,
    /// Items worked in parallel within a stage
    pub concurrency: usize,
    /// Per-item retry behavior
    pub retry: RetryPolicy,
    /// Reaction to permanent item failures
    pub failure_policy: FailurePolicy,
    /// Archive the checkpoint on success instead of deleting it
    pub retain_checkpoint: bool,
    /// Discard any existing checkpoint and start from scratch
    pub force_restart: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            failure_policy: FailurePolicy::default(),
            retain_checkpoint: false,
            force_restart: false,
        }
    }
}

impl PipelineConfig {
    /// Clamp out-of-range knobs instead of failing on them.
    pub fn normalized(mut self) -> Self {
        self.checkpoint_interval = self.checkpoint_interval.max(1);
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }
}
