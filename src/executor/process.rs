//! Host process executor.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use super::{ExecOptions, ExecResult, Executor, ExecutorError};

/// Runs actions as child processes of the dispatcher.
///
/// The child gets a null stdin and is killed if it outlives its timeout.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Create a process executor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(
        &self,
        program: &Path,
        args: &[String],
        opts: ExecOptions,
    ) -> Result<ExecResult, ExecutorError> {
        let started = Instant::now();

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| ExecutorError::Launch(format!("{}: {e}", program.display())))?;
        debug!(program = %program.display(), pid = ?child.id(), "action process spawned");

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(opts.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ExecutorError::Io(e.to_string()))?,
            Err(_) => {
                return Err(ExecutorError::Timeout {
                    seconds: opts.timeout.as_secs(),
                });
            }
        };

        Ok(ExecResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed(),
        })
    }
}
