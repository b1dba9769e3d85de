//! Fleet-level events broadcast by the supervisor and poller.

use chrono::{DateTime, Utc};
use fleetwatch_types::{ConnectionState, MemberId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::PolicyOutcome;

/// Why a member left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetireReason {
    /// No state change within the stall window.
    Stalled,

    /// Explicit `stop`.
    Stopped,

    /// The handle refused to hand out its event stream.
    SubscriptionFailed,
}

impl fmt::Display for RetireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetireReason::Stalled => write!(f, "stalled"),
            RetireReason::Stopped => write!(f, "stopped"),
            RetireReason::SubscriptionFailed => write!(f, "subscription failed"),
        }
    }
}

/// Events emitted by the fleet supervisor.
#[derive(Debug, Clone)]
pub enum FleetEvent {
    /// Member subscribed and is being monitored.
    MemberStarted(MemberId),

    /// The reconnect policy issued a `connect`.
    ConnectIssued {
        member_id: MemberId,
        outcome: PolicyOutcome,
    },

    /// An event could not be processed for a member.
    EventRejected { member_id: MemberId, reason: String },

    /// Member retired from monitoring.
    MemberRetired {
        member_id: MemberId,
        reason: RetireReason,
        last_state: Option<ConnectionState>,
        at: DateTime<Utc>,
    },

    /// One poll tick finished.
    PollCompleted { tick: u64, active: usize },
}
