//! Advisory per-job locking
//!
//! Two coordinators running against the same job id would interleave
//! checkpoint writes and corrupt progress counts, so each run takes a
//! non-blocking exclusive lock on `<job_id>.lock` before touching anything.

use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors raised while acquiring the job lock
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another process already holds the lock for this job
    #[error("job {0} is already in progress")]
    AlreadyRunning(String),

    /// The lock file could not be created or opened
    #[error("failed to open lock file: {0}")]
    Io(String),
}

/// Exclusive advisory lock over one job id, held until dropped.
pub struct JobLock {
    // The write guard is leaked on acquisition, so the OS lock is held for
    // as long as this file handle stays open.
    _lock: RwLock<File>,
    path: PathBuf,
}

impl JobLock {
    /// Try to take the lock for `job_id` without blocking.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` when another coordinator holds the lock.
    pub fn try_acquire(dir: &Path, job_id: &str) -> Result<Self, LockError> {
        std::fs::create_dir_all(dir).map_err(|e| LockError::Io(e.to_string()))?;

        let path = dir.join(format!("{job_id}.lock"));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::Io(e.to_string()))?;

        let mut lock = RwLock::new(file);
        match lock.try_write() {
            Ok(guard) => {
                // Keep the lock held past this scope; it is released when
                // the underlying file handle drops with JobLock.
                std::mem::forget(guard);
            }
            Err(_) => {
                debug!(job_id, path = %path.display(), "lock already held");
                return Err(LockError::AlreadyRunning(job_id.to_string()));
            }
        }

        debug!(job_id, path = %path.display(), "job lock acquired");
        Ok(Self { _lock: lock, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove its file.
    ///
    /// Called once the job is finished and its checkpoint is gone, so lock
    /// files do not pile up in the checkpoint directory. The file is
    /// unlinked while the lock is still held; the lock itself releases when
    /// `self` drops on return.
    pub fn dispose(self) -> Result<(), LockError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "job lock file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::Io(e.to_string())),
        }
    }
}
