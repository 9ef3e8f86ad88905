//! Action execution abstractions and implementations.
//!
//! An action is an external executable. [`Executor`] is the seam between the
//! dispatcher and how that executable is actually run, so tests can swap in
//! in-process fakes.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

pub mod process;

pub use process::ProcessExecutor;

/// Hard upper bound on a single action run.
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Action execution options.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Maximum runtime before the process is killed.
    pub timeout: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: ACTION_TIMEOUT,
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Process exit code (`None` when killed by a signal).
    pub exit_code: Option<i32>,
    /// Captured stdout text.
    pub stdout: String,
    /// Captured stderr text.
    pub stderr: String,
    /// Wall-clock duration of the execution.
    pub duration: Duration,
}

impl ExecResult {
    /// Returns `true` when the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Combined stdout+stderr output, separated by a newline when both are non-empty.
    pub fn output(&self) -> String {
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Errors produced by executor operations.
///
/// A non-zero exit status is not an error; it is reported through
/// [`ExecResult::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The process could not be started.
    #[error("{0}")]
    Launch(String),
    /// Collecting process output failed.
    #[error("{0}")]
    Io(String),
    /// The process exceeded its time budget and was killed.
    #[error("timed out after {seconds} s")]
    Timeout {
        /// Timeout budget in seconds.
        seconds: u64,
    },
}

/// Runs an action once and captures its output.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `program` with positional `args`, bounded by `opts.timeout`.
    async fn execute(
        &self,
        program: &Path,
        args: &[String],
        opts: ExecOptions,
    ) -> Result<ExecResult, ExecutorError>;
}

/// Outcome of running one resolved command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action finished; holds trimmed combined output (may be empty).
    Completed(String),
    /// The action was killed at the time bound.
    TimedOut {
        /// Time bound in seconds.
        seconds: u64,
    },
    /// The action could not be run.
    Failed(String),
}

impl ActionOutcome {
    /// Run an action exactly once and classify the result. Never retries.
    pub async fn run(
        executor: &dyn Executor,
        program: &Path,
        args: &[String],
        opts: ExecOptions,
    ) -> Self {
        match executor.execute(program, args, opts).await {
            Ok(result) => {
                debug!(
                    program = %program.display(),
                    exit_code = ?result.exit_code,
                    success = result.success(),
                    duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
                    "action finished"
                );
                Self::Completed(result.output().trim().to_owned())
            }
            Err(ExecutorError::Timeout { seconds }) => Self::TimedOut { seconds },
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Whether the action did not produce a normal result.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed(_))
    }

    /// Reply text for the mesh, tagged with the command name.
    pub fn reply_text(&self, command: &str) -> String {
        match self {
            Self::Completed(output) if output.is_empty() => {
                format!("[{command}] script ran, no output.")
            }
            Self::Completed(output) => output.clone(),
            Self::TimedOut { seconds } => {
                format!("[{command}] script timed out after {seconds} s.")
            }
            Self::Failed(reason) => format!("[{command}] script failed: {reason}"),
        }
    }
}
