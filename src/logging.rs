//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! `start` always keeps a JSON file log (daily rotation) and adds a
//! human-readable stderr layer whose verbosity depends on the transport, see
//! [`LogMode`]. One-shot subcommands use [`init_cli`].

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// File name prefix of the rotated JSON log.
pub const LOG_FILE_PREFIX: &str = "mesh-commander.log";

/// Holds the non-blocking writer guard for file logging.
///
/// Dropping it flushes pending log entries and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Stderr behaviour of the `start` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Unattended bridge session: full info-level lines on stderr.
    Bridge,
    /// Console transport: stdin/stdout carry the conversation, so stderr
    /// only shows warnings in a compact form.
    Console,
}

impl LogMode {
    /// Stderr level used when `RUST_LOG` is not set.
    pub fn default_stderr_level(self) -> &'static str {
        match self {
            Self::Bridge => "info",
            Self::Console => "warn",
        }
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialise logging for the `start` subcommand.
///
/// JSON lines go to `{logs_dir}/mesh-commander.log.YYYY-MM-DD` at `info`
/// (or `RUST_LOG`) regardless of `mode`.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path, mode: LogMode) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_filter = env_filter(mode.default_stderr_level());
    let stderr_layer: Box<dyn Layer<Registry> + Send + Sync> = match mode {
        LogMode::Bridge => fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter)
            .boxed(),
        LogMode::Console => fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter)
            .boxed(),
    };

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(env_filter("info"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Initialise stderr-only logging for `check` and `init` (default: `warn`).
pub fn init_cli() {
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .try_init();
}
