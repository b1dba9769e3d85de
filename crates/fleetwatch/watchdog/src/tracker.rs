//! Per-member record of the last observed state change.
//!
//! Written by the member's event processing, read by the poller. Both sides
//! take the lock only to copy a small value in or out.

use chrono::{DateTime, Utc};
use fleetwatch_types::ConnectionState;
use parking_lot::Mutex;
use tokio::time::Instant;

/// A single recorded state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    /// New state.
    pub state: ConnectionState,

    /// Monotonic time of the change; drives stall detection.
    pub at: Instant,

    /// Wall-clock time of the change; used for reporting only.
    pub wall: DateTime<Utc>,
}

/// Immutable copy of a tracker's contents.
///
/// A snapshot with no change means the member has not reported anything yet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateSnapshot {
    last_change: Option<StateChange>,
}

impl StateSnapshot {
    /// Snapshot of a member that has never changed state.
    pub fn initial() -> Self {
        Self::default()
    }

    pub fn from_change(change: StateChange) -> Self {
        Self {
            last_change: Some(change),
        }
    }

    /// Snapshot of `state` entered at `at`.
    pub fn at(state: ConnectionState, at: Instant) -> Self {
        Self::from_change(StateChange {
            state,
            at,
            wall: Utc::now(),
        })
    }

    pub fn timestamp(&self) -> Option<Instant> {
        self.last_change.map(|c| c.at)
    }

    pub fn state(&self) -> Option<ConnectionState> {
        self.last_change.map(|c| c.state)
    }

    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        self.last_change.map(|c| c.wall)
    }

    pub fn last_change(&self) -> Option<&StateChange> {
        self.last_change.as_ref()
    }

    pub fn has_changed(&self) -> bool {
        self.last_change.is_some()
    }
}

/// Mutable cell holding a member's last state change.
#[derive(Debug, Default)]
pub struct StateTracker {
    last: Mutex<Option<StateChange>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `state` as entered now and return the resulting snapshot.
    ///
    /// The stored instant never moves backwards, even if the caller's clock
    /// reading is older than the previous record.
    pub fn record(&self, state: ConnectionState) -> StateSnapshot {
        let now = Instant::now();
        let wall = Utc::now();

        let mut last = self.last.lock();
        let at = match *last {
            Some(prev) if prev.at > now => prev.at,
            _ => now,
        };
        let change = StateChange { state, at, wall };
        *last = Some(change);

        StateSnapshot::from_change(change)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            last_change: *self.last.lock(),
        }
    }
}
