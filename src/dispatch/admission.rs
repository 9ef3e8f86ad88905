//! Admission filter: decides whether an inbound event may be dispatched.
//!
//! Rules run in a fixed order and the first failing rule names the rejection:
//! startup grace period, staleness, content type, channel slot.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::DispatchConfig;
use crate::mesh::InboundEvent;

/// Why an event was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Received too soon after startup; likely replayed history.
    GracePeriod,
    /// Receipt timestamp is older than the maximum message age.
    Stale,
    /// Payload is not a plain text message.
    NotText,
    /// Payload arrived on a different channel slot.
    WrongChannel,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::GracePeriod => "grace period",
            Self::Stale => "stale",
            Self::NotText => "not text",
            Self::WrongChannel => "wrong channel",
        };
        f.write_str(reason)
    }
}

/// Outcome of admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// The event may be dispatched.
    Accepted,
    /// The event is skipped.
    Rejected(RejectReason),
}

/// Pure admission policy over an event and the current time.
#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    started_at: DateTime<Utc>,
    startup_grace: TimeDelta,
    max_msg_age: TimeDelta,
    channel_slot: u32,
}

impl AdmissionFilter {
    /// Build a filter. `started_at` is captured once at process start.
    pub fn new(
        started_at: DateTime<Utc>,
        startup_grace_secs: u64,
        max_msg_age_secs: u64,
        channel_slot: u32,
    ) -> Self {
        Self {
            started_at,
            startup_grace: seconds(startup_grace_secs),
            max_msg_age: seconds(max_msg_age_secs),
            channel_slot,
        }
    }

    /// Build a filter from the `[dispatch]` config section.
    pub fn from_config(started_at: DateTime<Utc>, config: &DispatchConfig) -> Self {
        Self::new(
            started_at,
            config.startup_grace_secs,
            config.max_msg_age_secs,
            config.channel_slot,
        )
    }

    /// Decide whether `event` is admitted at time `now`.
    pub fn evaluate(&self, event: &InboundEvent, now: DateTime<Utc>) -> AdmissionDecision {
        if now.signed_duration_since(self.started_at) < self.startup_grace {
            return AdmissionDecision::Rejected(RejectReason::GracePeriod);
        }

        if let Some(rx_time) = event.rx_time {
            if now.signed_duration_since(rx_time) > self.max_msg_age {
                return AdmissionDecision::Rejected(RejectReason::Stale);
            }
        }

        let is_text = event
            .portnum
            .as_ref()
            .is_some_and(|port| port.is_text_message());
        if !is_text {
            return AdmissionDecision::Rejected(RejectReason::NotText);
        }

        if event.channel_index != Some(self.channel_slot) {
            return AdmissionDecision::Rejected(RejectReason::WrongChannel);
        }

        AdmissionDecision::Accepted
    }
}

fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
