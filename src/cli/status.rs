//! Status command: inspect saved progress

use crate::checkpoint::CheckpointStore;
use clap::Args;
use std::path::Path;

use super::CliError;

/// Arguments for `coldpack status`
#[derive(Debug, Args)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Print one line per job with saved progress in the checkpoint
    /// directory.
    pub fn execute(&self, checkpoint_dir: &Path) -> Result<(), CliError> {
        let store = CheckpointStore::new(checkpoint_dir);
        let jobs = store.list()?;
        if jobs.is_empty() {
            println!("no jobs in progress");
            return Ok(());
        }
        for job_id in jobs {
            match store.load(&job_id) {
                Ok(doc) => {
                    let totals = doc.totals();
                    println!(
                        "{job_id}: stage={} items={}/{} [{}]",
                        doc.stage(),
                        totals.completed_items,
                        totals.total_items,
                        doc.config_snapshot()
                    );
                }
                Err(e) => println!("{job_id}: unreadable ({e})"),
            }
        }
        Ok(())
    }
}
