//! Per-tick observation records and the sinks that receive them.
//!
//! Reporting is best effort: a sink cannot fail the poll loop.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use fleetwatch_types::{ConnectionState, MemberId};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::tracker::StateSnapshot;

/// What the poller saw for one member on one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub tick: u64,
    pub member_id: MemberId,
    pub changed_at: Option<DateTime<Utc>>,
    pub state: Option<ConnectionState>,
    pub active: bool,
}

impl Observation {
    pub fn new(tick: u64, member_id: MemberId, snapshot: &StateSnapshot, active: bool) -> Self {
        Self {
            tick,
            member_id,
            changed_at: snapshot.changed_at(),
            state: snapshot.state(),
            active,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<12} -> ", self.member_id)?;
        match self.state {
            Some(state) => write!(f, "{:<12}", state)?,
            None => write!(f, "{:<12}", "none")?,
        }
        match self.changed_at {
            Some(at) => write!(f, " @ {}", at.to_rfc3339_opts(SecondsFormat::Millis, true))?,
            None => write!(f, " @ never")?,
        }
        if !self.active {
            write!(f, " (retired)")?;
        }
        Ok(())
    }
}

/// Receiver of poll observations.
pub trait ObservationSink: Send + Sync {
    fn observe(&self, observation: &Observation);
}

/// Logs every observation at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn observe(&self, observation: &Observation) {
        info!(
            target: "fleetwatch::report",
            tick = observation.tick,
            member_id = %observation.member_id,
            "{}",
            observation
        );
    }
}

/// Keeps observations in memory; latest per member plus the full log.
#[derive(Debug, Default)]
pub struct MemorySink {
    latest: DashMap<MemberId, Observation>,
    log: Mutex<Vec<Observation>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, member_id: &MemberId) -> Option<Observation> {
        self.latest.get(member_id).map(|o| o.clone())
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.log.lock().clone()
    }

    /// Observations recorded for `member_id`, oldest first.
    pub fn history(&self, member_id: &MemberId) -> Vec<Observation> {
        self.log
            .lock()
            .iter()
            .filter(|o| &o.member_id == member_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObservationSink for MemorySink {
    fn observe(&self, observation: &Observation) {
        self.latest
            .insert(observation.member_id.clone(), observation.clone());
        self.log.lock().push(observation.clone());
    }
}
