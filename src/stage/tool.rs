//! External tool invocation
//!
//! All bulk work (transfer, archival, cloning) is delegated to external
//! commands. The invoker captures output, logs it, and reduces every run to
//! success / failure-with-reason for the coordinator.

use super::{StageError, StageResult};
use std::ffi::OsStr;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs external commands and checks their availability.
#[derive(Debug, Clone, Default)]
pub struct ToolInvoker;

impl ToolInvoker {
    /// Run a command to completion, capturing stdout/stderr.
    ///
    /// # Errors
    ///
    /// `ToolMissing` when the program cannot be spawned, `ToolFailed` on a
    /// non-zero exit status (stderr is carried in the reason).
    pub async fn run<I, S>(&self, program: &str, args: I) -> StageResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<std::ffi::OsString> =
            args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        debug!(program, ?args, "invoking external tool");

        let output = Command::new(program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StageError::ToolMissing(program.to_string())
                } else {
                    StageError::Io(format!("failed to spawn {program}: {e}"))
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            warn!(program, status = %output.status, stderr, "external tool failed");
            return Err(StageError::ToolFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            debug!(program, stderr, "external tool warnings");
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Check that a program is resolvable on PATH without running it.
    pub fn ensure_available(&self, program: &str) -> StageResult<()> {
        if find_on_path(program).is_some() {
            Ok(())
        } else {
            Err(StageError::ToolMissing(program.to_string()))
        }
    }
}

/// Resolve a program name against the PATH environment variable.
fn find_on_path(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}
