//! One supervised connection and the task that drains its event stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fleetwatch_types::{AddressScheme, MemberId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{WatchdogError, WatchdogResult};
use crate::events::FleetEvent;
use crate::handle::{ConnectionHandle, EventStream};
use crate::policy::ReconnectPolicy;
use crate::tracker::{StateSnapshot, StateTracker};

/// Lifecycle of a member as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberPhase {
    /// Created, event stream not yet taken.
    Unstarted,

    /// Event stream subscribed, policy active.
    Monitoring,

    /// Disconnected and excluded from monitoring for good.
    Retired,
}

struct Lifecycle {
    phase: MemberPhase,
    actor: Option<JoinHandle<()>>,
}

pub(crate) struct Member {
    id: MemberId,
    handle: Arc<dyn ConnectionHandle>,
    tracker: Arc<StateTracker>,
    lifecycle: Mutex<Lifecycle>,
    /// Mirrors `phase == Retired` for the actor, which must not lock.
    retired: Arc<AtomicBool>,
}

impl Member {
    pub(crate) fn new(id: MemberId, handle: Arc<dyn ConnectionHandle>) -> Self {
        Self {
            id,
            handle,
            tracker: Arc::new(StateTracker::new()),
            lifecycle: Mutex::new(Lifecycle {
                phase: MemberPhase::Unstarted,
                actor: None,
            }),
            retired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn id(&self) -> &MemberId {
        &self.id
    }

    pub(crate) fn phase(&self) -> MemberPhase {
        self.lifecycle.lock().phase
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self) -> StateSnapshot {
        self.tracker.snapshot()
    }

    /// Subscribe to the handle and spawn the event actor.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start(
        &self,
        address_scheme: Option<AddressScheme>,
        event_tx: broadcast::Sender<FleetEvent>,
    ) -> WatchdogResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.phase {
            MemberPhase::Monitoring => return Err(WatchdogError::AlreadyStarted(self.id.clone())),
            MemberPhase::Retired => return Err(WatchdogError::AlreadyRetired(self.id.clone())),
            MemberPhase::Unstarted => {}
        }

        let events = self
            .handle
            .subscribe()
            .ok_or_else(|| WatchdogError::SubscriptionUnavailable(self.id.clone()))?;

        let policy = ReconnectPolicy::new(
            self.id.clone(),
            self.handle.clone(),
            self.tracker.clone(),
            address_scheme,
        );
        let actor = tokio::spawn(run_actor(policy, events, self.retired.clone(), event_tx));

        lifecycle.phase = MemberPhase::Monitoring;
        lifecycle.actor = Some(actor);

        Ok(())
    }

    /// Retire the member. Returns `false` if it was already retired.
    ///
    /// The event actor is stopped before `disconnect` so the disconnect this
    /// causes is never answered with a reconnect.
    pub(crate) fn retire(&self) -> bool {
        let actor = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.phase == MemberPhase::Retired {
                return false;
            }
            lifecycle.phase = MemberPhase::Retired;
            self.retired.store(true, Ordering::Release);
            lifecycle.actor.take()
        };

        if let Some(actor) = actor {
            actor.abort();
        }
        self.handle.disconnect();

        true
    }

    pub(crate) fn abort_actor(&self) {
        if let Some(actor) = self.lifecycle.lock().actor.take() {
            actor.abort();
        }
    }
}

async fn run_actor(
    policy: ReconnectPolicy,
    mut events: EventStream,
    retired: Arc<AtomicBool>,
    event_tx: broadcast::Sender<FleetEvent>,
) {
    while let Some(event) = events.recv().await {
        if retired.load(Ordering::Acquire) {
            break;
        }

        match policy.on_event(&event) {
            Ok(outcome) if outcome.issued_connect() => {
                let _ = event_tx.send(FleetEvent::ConnectIssued {
                    member_id: policy.member_id().clone(),
                    outcome,
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(member_id = %policy.member_id(), error = %e, "Rejected connection event");
                let _ = event_tx.send(FleetEvent::EventRejected {
                    member_id: policy.member_id().clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(member_id = %policy.member_id(), "Event stream closed");
}
