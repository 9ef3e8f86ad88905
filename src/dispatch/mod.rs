//! Event dispatcher: admission → resolution → execution → reply.
//!
//! The dispatcher is a single worker. Each inbound event is processed to
//! completion, including the action run and every reply chunk, before the
//! next event is taken from the subscription. At most one action process is
//! ever in flight; events that arrive meanwhile wait in the transport buffer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::executor::{ActionOutcome, ExecOptions, Executor, ACTION_TIMEOUT};
use crate::mesh::{EventStream, InboundEvent, MeshTransport};
use crate::reply::{self, PACING_DELAY};

pub mod admission;
pub mod resolver;

pub use admission::{AdmissionDecision, AdmissionFilter, RejectReason};
pub use resolver::{resolve, ActionTable, NoMatch, ParsedCommand, ResolvedCommand};

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Admission rejected the event. Nothing was sent.
    Rejected(RejectReason),
    /// The text did not resolve to an action. Nothing was sent.
    NoMatch(NoMatch),
    /// An action ran (or failed) and a reply was transmitted.
    Replied {
        /// Command name that ran.
        command: String,
        /// Whether the action timed out or failed to start.
        action_failed: bool,
        /// Number of chunks attempted.
        chunks: usize,
        /// Indices of chunks whose send failed.
        failed_sends: Vec<usize>,
    },
}

/// Single-worker command dispatcher.
pub struct Dispatcher {
    admission: AdmissionFilter,
    actions: ActionTable,
    executor: Arc<dyn Executor>,
    transport: Arc<dyn MeshTransport>,
    channel_slot: u32,
    chunk_size: usize,
    pacing: Duration,
    action_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("admission", &self.admission)
            .field("actions", &self.actions.len())
            .field("transport", &self.transport.name())
            .field("channel_slot", &self.channel_slot)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build a dispatcher from validated config.
    ///
    /// `started_at` is the process start time, captured once by the caller.
    pub fn new(
        config: &Config,
        started_at: DateTime<Utc>,
        executor: Arc<dyn Executor>,
        transport: Arc<dyn MeshTransport>,
    ) -> Self {
        Self {
            admission: AdmissionFilter::from_config(started_at, &config.dispatch),
            actions: ActionTable::new(config.actions.clone()),
            executor,
            transport,
            channel_slot: config.dispatch.channel_slot,
            chunk_size: config.dispatch.chunk_size,
            pacing: PACING_DELAY,
            action_timeout: ACTION_TIMEOUT,
        }
    }

    /// Override the pause between reply chunks.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Override the action time bound.
    #[must_use]
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Process one event to completion at time `now`.
    ///
    /// Never fails: rejections and misses are silent, action failures become
    /// reply text, and send failures are logged per chunk.
    pub async fn handle_event(&self, event: InboundEvent, now: DateTime<Utc>) -> DispatchOutcome {
        if let AdmissionDecision::Rejected(reason) = self.admission.evaluate(&event, now) {
            debug!(
                %reason,
                channel_index = ?event.channel_index,
                portnum = ?event.portnum,
                "event skipped"
            );
            return DispatchOutcome::Rejected(reason);
        }

        let text = event.text.as_deref().unwrap_or_default().trim();
        debug!(channel_index = self.channel_slot, %text, "text message admitted");

        let resolved = match resolve(text, &self.actions) {
            Ok(resolved) => resolved,
            Err(miss) => {
                debug!(%miss, "no action for message");
                return DispatchOutcome::NoMatch(miss);
            }
        };
        let ResolvedCommand { command, action } = resolved;

        info!(
            command = %command.name,
            action = %action.display(),
            args = ?command.args,
            "running action"
        );
        let opts = ExecOptions {
            timeout: self.action_timeout,
        };
        let outcome = ActionOutcome::run(&*self.executor, &action, &command.args, opts).await;
        let reply_text = outcome.reply_text(&command.name);
        if outcome.is_failure() {
            warn!(command = %command.name, reply = %reply_text, "action failed");
        }

        let report = reply::send_reply(
            &*self.transport,
            &reply_text,
            self.chunk_size,
            self.channel_slot,
            self.pacing,
        )
        .await;
        info!(
            command = %command.name,
            sent = report.sent,
            failed = report.failed.len(),
            "reply transmitted"
        );

        DispatchOutcome::Replied {
            command: command.name,
            action_failed: outcome.is_failure(),
            chunks: report.attempted(),
            failed_sends: report.failed,
        }
    }

    /// Drain `events` one at a time until the stream ends or `shutdown`
    /// resolves, then close the transport.
    ///
    /// An action still running at shutdown is abandoned.
    pub async fn run<F>(&self, mut events: EventStream, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            channel_slot = self.channel_slot,
            actions = self.actions.len(),
            transport = self.transport.name(),
            "dispatcher listening"
        );

        loop {
            let next = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                next = events.recv() => next,
            };
            let Some(event) = next else {
                info!("event stream ended");
                break;
            };

            tokio::select! {
                _ = self.handle_event(event, Utc::now()) => {}
                () = &mut shutdown => {
                    warn!("shutdown requested while handling an event, abandoning it");
                    break;
                }
            }
        }

        self.transport.close().await;
    }
}
