//! Fleet poller: the single control loop over all members.
//!
//! Every interval the poller snapshots each member, retires the active ones
//! that are stalled, and reports one observation per member. It returns only
//! once no member is active, either because all stalled or because the
//! fleet was stopped.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_types::MemberId;
use serde::Serialize;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::events::{FleetEvent, RetireReason};
use crate::report::{Observation, ObservationSink};
use crate::stall::StallDetector;
use crate::supervisor::FleetSupervisor;

/// Outcome of a finished poll loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    /// Number of ticks run.
    pub ticks: u64,

    /// Members this poller retired as stalled, in retirement order.
    pub stalled: Vec<MemberId>,
}

/// Drives stall detection for one fleet.
pub struct FleetPoller {
    supervisor: Arc<FleetSupervisor>,
    detector: StallDetector,
    interval: Duration,
    sink: Arc<dyn ObservationSink>,
}

impl FleetPoller {
    /// Poller using the supervisor's configured interval and window.
    pub fn new(supervisor: Arc<FleetSupervisor>, sink: Arc<dyn ObservationSink>) -> Self {
        let detector = supervisor.config().stall_detector();
        let interval = supervisor.config().poll_interval;
        Self {
            supervisor,
            detector,
            interval,
            sink,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn detector(&self) -> &StallDetector {
        &self.detector
    }

    /// Run until the active set is empty.
    pub async fn run(&self) -> PollSummary {
        let mut summary = PollSummary::default();

        info!(
            members = self.supervisor.len(),
            interval_ms = self.interval.as_millis() as u64,
            window_ms = self.detector.window().as_millis() as u64,
            "Fleet poller started"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.supervisor.active_count() > 0 {
            ticker.tick().await;
            summary.ticks += 1;
            let stalled = self.poll_once(summary.ticks);
            summary.stalled.extend(stalled);
        }

        info!(
            ticks = summary.ticks,
            stalled = summary.stalled.len(),
            "Fleet poller finished"
        );
        summary
    }

    /// Evaluate every member once at the current time. Returns the members
    /// retired as stalled on this tick.
    pub fn poll_once(&self, tick: u64) -> Vec<MemberId> {
        let now = Instant::now();
        let mut stalled = Vec::new();

        for view in self.supervisor.views() {
            let mut active = view.active;

            if active && self.detector.is_stalled(&view.snapshot, now) {
                match self.supervisor.retire(&view.member_id, RetireReason::Stalled) {
                    Ok(true) => {
                        warn!(
                            member_id = %view.member_id,
                            last_state = ?view.snapshot.state(),
                            "Member stalled"
                        );
                        stalled.push(view.member_id.clone());
                        active = false;
                    }
                    // Retired concurrently, e.g. by stop().
                    Ok(false) => active = false,
                    Err(e) => {
                        warn!(member_id = %view.member_id, error = %e, "Failed to retire member");
                    }
                }
            }

            self.sink
                .observe(&Observation::new(tick, view.member_id, &view.snapshot, active));
        }

        let active = self.supervisor.active_count();
        debug!(tick, active, "Poll tick completed");
        let _ = self
            .supervisor
            .event_sender()
            .send(FleetEvent::PollCompleted { tick, active });

        stalled
    }
}
