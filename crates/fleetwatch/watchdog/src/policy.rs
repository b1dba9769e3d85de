//! Reconnect policy applied to every event a member reports.
//!
//! - `WalletAdded`: connect unless the member is already connected.
//! - `StateChanged`: record the new state; reconnect if it is DISCONNECTED.
//! - `Unrecognized`: rejected without touching the tracker.
//! - everything else: ignored.

use std::fmt;
use std::sync::Arc;

use fleetwatch_types::{AddressScheme, ConnectionEvent, ConnectionState, MemberId};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{WatchdogError, WatchdogResult};
use crate::handle::ConnectionHandle;
use crate::tracker::StateTracker;

/// What the policy did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PolicyOutcome {
    /// Nothing to do for this event.
    Ignored,

    /// New state recorded, no side effect on the handle.
    Recorded(ConnectionState),

    /// `connect` issued for a newly added wallet.
    Connected,

    /// DISCONNECTED recorded and `connect` issued.
    Reconnected,
}

impl PolicyOutcome {
    pub fn issued_connect(&self) -> bool {
        matches!(self, PolicyOutcome::Connected | PolicyOutcome::Reconnected)
    }
}

impl fmt::Display for PolicyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyOutcome::Ignored => write!(f, "ignored"),
            PolicyOutcome::Recorded(state) => write!(f, "recorded {}", state),
            PolicyOutcome::Connected => write!(f, "connect"),
            PolicyOutcome::Reconnected => write!(f, "reconnect"),
        }
    }
}

/// Reactive connect/reconnect rules for one member.
pub struct ReconnectPolicy {
    member_id: MemberId,
    handle: Arc<dyn ConnectionHandle>,
    tracker: Arc<StateTracker>,
    address_scheme: Option<AddressScheme>,
}

impl ReconnectPolicy {
    pub fn new(
        member_id: MemberId,
        handle: Arc<dyn ConnectionHandle>,
        tracker: Arc<StateTracker>,
        address_scheme: Option<AddressScheme>,
    ) -> Self {
        Self {
            member_id,
            handle,
            tracker,
            address_scheme,
        }
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    /// Apply the policy to one event.
    pub fn on_event(&self, event: &ConnectionEvent) -> WatchdogResult<PolicyOutcome> {
        trace!(member_id = %self.member_id, event = %event, "Handling connection event");

        match event {
            ConnectionEvent::WalletAdded { currency } => {
                let current = self.tracker.snapshot().state();
                if current.is_some_and(|state| state.is_connected()) {
                    debug!(
                        member_id = %self.member_id,
                        currency = %currency,
                        "Wallet added to connected member"
                    );
                    return Ok(PolicyOutcome::Ignored);
                }

                debug!(member_id = %self.member_id, currency = %currency, "Connecting for new wallet");
                self.handle.connect(self.address_scheme);
                Ok(PolicyOutcome::Connected)
            }

            ConnectionEvent::StateChanged { old, new } => {
                self.tracker.record(*new);

                if *new == ConnectionState::Disconnected {
                    debug!(member_id = %self.member_id, old = %old, "Reconnecting dropped member");
                    self.handle.connect(self.address_scheme);
                    Ok(PolicyOutcome::Reconnected)
                } else {
                    Ok(PolicyOutcome::Recorded(*new))
                }
            }

            ConnectionEvent::Unrecognized { discriminant } => Err(WatchdogError::UnrecognizedEvent {
                member_id: self.member_id.clone(),
                discriminant: discriminant.clone(),
            }),

            ConnectionEvent::Created
            | ConnectionEvent::SyncProgress { .. }
            | ConnectionEvent::Wallet { .. }
            | ConnectionEvent::Transfer { .. }
            | ConnectionEvent::Network { .. } => Ok(PolicyOutcome::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedHandle;

    fn policy_for(handle: Arc<ScriptedHandle>) -> (ReconnectPolicy, Arc<StateTracker>) {
        let tracker = Arc::new(StateTracker::new());
        let policy = ReconnectPolicy::new(
            MemberId::new("m-0"),
            handle,
            tracker.clone(),
            Some(AddressScheme::BtcLegacy),
        );
        (policy, tracker)
    }

    fn wallet_added() -> ConnectionEvent {
        ConnectionEvent::WalletAdded {
            currency: "btc".to_string(),
        }
    }

    #[test]
    fn test_wallet_added_connects_fresh_member() {
        let handle = ScriptedHandle::new();
        let (policy, _) = policy_for(handle.clone());

        let outcome = policy.on_event(&wallet_added()).unwrap();

        assert_eq!(outcome, PolicyOutcome::Connected);
        assert_eq!(handle.connect_count(), 1);
        assert_eq!(handle.last_scheme(), Some(Some(AddressScheme::BtcLegacy)));
    }

    #[test]
    fn test_wallet_added_to_connected_member_is_ignored() {
        let handle = ScriptedHandle::new();
        let (policy, tracker) = policy_for(handle.clone());

        for state in [ConnectionState::Connected, ConnectionState::Syncing] {
            tracker.record(state);
            assert_eq!(policy.on_event(&wallet_added()).unwrap(), PolicyOutcome::Ignored);
        }
        assert_eq!(handle.connect_count(), 0);
    }

    #[test]
    fn test_disconnect_triggers_reconnect() {
        let handle = ScriptedHandle::new();
        let (policy, tracker) = policy_for(handle.clone());

        let outcome = policy
            .on_event(&ConnectionEvent::state_changed(
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ))
            .unwrap();

        assert_eq!(outcome, PolicyOutcome::Reconnected);
        assert_eq!(handle.connect_count(), 1);
        assert_eq!(tracker.snapshot().state(), Some(ConnectionState::Disconnected));
    }

    #[test]
    fn test_other_state_changes_are_recorded() {
        let handle = ScriptedHandle::new();
        let (policy, tracker) = policy_for(handle.clone());

        let outcome = policy
            .on_event(&ConnectionEvent::state_changed(
                ConnectionState::Connected,
                ConnectionState::Syncing,
            ))
            .unwrap();

        assert_eq!(outcome, PolicyOutcome::Recorded(ConnectionState::Syncing));
        assert_eq!(tracker.snapshot().state(), Some(ConnectionState::Syncing));
        assert_eq!(handle.connect_count(), 0);
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        let handle = ScriptedHandle::new();
        let (policy, tracker) = policy_for(handle.clone());

        let events = [
            ConnectionEvent::Created,
            ConnectionEvent::SyncProgress { percent: 50.0 },
            ConnectionEvent::Network {
                detail: "height 100".to_string(),
            },
        ];
        for event in &events {
            assert_eq!(policy.on_event(event).unwrap(), PolicyOutcome::Ignored);
        }

        assert!(!tracker.snapshot().has_changed());
        assert_eq!(handle.connect_count(), 0);
    }

    #[test]
    fn test_unrecognized_event_leaves_tracker_untouched() {
        let handle = ScriptedHandle::new();
        let (policy, tracker) = policy_for(handle.clone());
        tracker.record(ConnectionState::Connected);
        let before = tracker.snapshot();

        let err = policy
            .on_event(&ConnectionEvent::state_changed_from_labels("CONNECTED", "WARPING"))
            .unwrap_err();

        assert!(matches!(
            err,
            WatchdogError::UnrecognizedEvent { ref discriminant, .. } if discriminant == "WARPING"
        ));
        assert_eq!(tracker.snapshot(), before);
        assert_eq!(handle.connect_count(), 0);
    }
}
