//! End-of-run reporting

use crate::checkpoint::{Stage, Totals};
use std::time::Duration;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage finished with every item complete
    Completed,
    /// The run went as far as it could but some items failed permanently
    CompletedWithErrors,
    /// A permanent failure stopped the run early (fail-fast policy)
    Halted(Stage),
    /// Cancellation stopped the run; progress was saved
    Interrupted,
}

/// What one coordinator run accomplished.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Job identity token
    pub job_id: String,
    /// How the run ended
    pub outcome: RunOutcome,
    /// Stage the job is in after the run
    pub stage: Stage,
    /// Aggregate item and byte counters
    pub totals: Totals,
    /// Item ids that failed permanently, with their last error
    pub failed: Vec<(String, String)>,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Set when a checkpoint save failed during the run (progress since the
    /// last good save would be repeated after a crash)
    pub checkpoint_degraded: bool,
}

impl RunSummary {
    /// True only for a fully clean run.
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match &self.outcome {
            RunOutcome::Completed => "completed".to_string(),
            RunOutcome::CompletedWithErrors => "completed with errors".to_string(),
            RunOutcome::Halted(stage) => format!("halted during {stage}"),
            RunOutcome::Interrupted => "interrupted".to_string(),
        };
        writeln!(f, "job:       {}", self.job_id)?;
        writeln!(f, "status:    {status}")?;
        writeln!(f, "stage:     {}", self.stage)?;
        writeln!(
            f,
            "items:     {}/{} complete",
            self.totals.completed_items, self.totals.total_items
        )?;
        writeln!(
            f,
            "bytes:     {}/{}",
            self.totals.completed_bytes, self.totals.total_bytes
        )?;
        writeln!(f, "duration:  {:.1}s", self.duration.as_secs_f64())?;
        if self.checkpoint_degraded {
            writeln!(f, "warning:   some checkpoint saves failed")?;
        }
        if !self.failed.is_empty() {
            writeln!(f, "failed items:")?;
            for (id, reason) in &self.failed {
                writeln!(f, "  {id}: {reason}")?;
            }
        }
        Ok(())
    }
}
