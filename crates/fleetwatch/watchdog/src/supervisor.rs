//! Fleet supervisor: owns every member and its lifecycle.
//!
//! Membership is fixed at construction. Each member moves
//! `Unstarted -> Monitoring -> Retired` and never comes back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use fleetwatch_types::MemberId;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::WatchdogConfig;
use crate::error::{WatchdogError, WatchdogResult};
use crate::events::{FleetEvent, RetireReason};
use crate::handle::ConnectionHandle;
use crate::member::{Member, MemberPhase};
use crate::tracker::StateSnapshot;

/// Point-in-time view of one member, taken by the poller.
#[derive(Debug, Clone)]
pub struct MemberView {
    pub member_id: MemberId,
    pub snapshot: StateSnapshot,
    pub active: bool,
}

/// Supervisor for a fixed fleet of connections.
pub struct FleetSupervisor {
    /// Configuration.
    config: WatchdogConfig,

    /// Members in construction order.
    members: Vec<Arc<Member>>,

    /// Position of each member in `members`.
    index: HashMap<MemberId, usize>,

    /// Retired members and why.
    retired: DashMap<MemberId, RetireReason>,

    /// Event broadcaster.
    event_tx: broadcast::Sender<FleetEvent>,
}

impl FleetSupervisor {
    /// Build a supervisor over `handles`. Ids must be unique.
    pub fn new<I>(config: WatchdogConfig, handles: I) -> WatchdogResult<Self>
    where
        I: IntoIterator<Item = (MemberId, Arc<dyn ConnectionHandle>)>,
    {
        config.validate()?;

        let mut members = Vec::new();
        let mut index = HashMap::new();
        for (member_id, handle) in handles {
            if index.contains_key(&member_id) {
                return Err(WatchdogError::DuplicateMember(member_id));
            }
            index.insert(member_id.clone(), members.len());
            members.push(Arc::new(Member::new(member_id, handle)));
        }

        let (event_tx, _) = broadcast::channel(1024);

        Ok(Self {
            config,
            members,
            index,
            retired: DashMap::new(),
            event_tx,
        })
    }

    /// Subscribe to fleet events.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn event_sender(&self) -> &broadcast::Sender<FleetEvent> {
        &self.event_tx
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id().clone()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_active()).count()
    }

    pub fn active_members(&self) -> Vec<MemberId> {
        self.members
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.id().clone())
            .collect()
    }

    pub fn is_active(&self, member_id: &MemberId) -> bool {
        self.member(member_id).map(|m| m.is_active()).unwrap_or(false)
    }

    pub fn phase(&self, member_id: &MemberId) -> WatchdogResult<MemberPhase> {
        Ok(self.member(member_id)?.phase())
    }

    pub fn snapshot(&self, member_id: &MemberId) -> WatchdogResult<StateSnapshot> {
        Ok(self.member(member_id)?.snapshot())
    }

    /// Snapshot every member, active or not, in fleet order.
    pub fn views(&self) -> Vec<MemberView> {
        self.members
            .iter()
            .map(|m| MemberView {
                member_id: m.id().clone(),
                snapshot: m.snapshot(),
                active: m.is_active(),
            })
            .collect()
    }

    pub fn retire_reason(&self, member_id: &MemberId) -> Option<RetireReason> {
        self.retired.get(member_id).map(|r| *r)
    }

    /// All retirements so far, in fleet order.
    pub fn retirements(&self) -> Vec<(MemberId, RetireReason)> {
        self.members
            .iter()
            .filter_map(|m| self.retire_reason(m.id()).map(|r| (m.id().clone(), r)))
            .collect()
    }

    /// Start monitoring every unstarted member.
    ///
    /// Members already monitoring are left alone. A member whose handle will
    /// not hand out its event stream is retired right away. Returns the
    /// number of members started by this call. Must be called from within a
    /// Tokio runtime.
    #[instrument(skip(self), fields(members = self.members.len()))]
    pub fn start(&self) -> usize {
        let mut started = 0;

        for member in &self.members {
            match self.start_member(member.id()) {
                Ok(()) => started += 1,
                Err(WatchdogError::AlreadyStarted(_)) | Err(WatchdogError::AlreadyRetired(_)) => {}
                Err(e @ WatchdogError::SubscriptionUnavailable(_)) => {
                    warn!(member_id = %member.id(), error = %e, "Cannot monitor member");
                    let _ = self.retire(member.id(), RetireReason::SubscriptionFailed);
                }
                Err(e) => {
                    warn!(member_id = %member.id(), error = %e, "Failed to start member");
                }
            }
        }

        info!(started, "Fleet monitoring started");
        started
    }

    /// Start monitoring a single member.
    pub fn start_member(&self, member_id: &MemberId) -> WatchdogResult<()> {
        let member = self.member(member_id)?;
        member.start(self.config.address_scheme, self.event_tx.clone())?;

        debug!(member_id = %member_id, "Member monitoring started");
        let _ = self
            .event_tx
            .send(FleetEvent::MemberStarted(member_id.clone()));

        Ok(())
    }

    /// Retire every still-active member. Safe to call repeatedly; returns
    /// the number of members retired by this call.
    #[instrument(skip(self))]
    pub fn stop(&self) -> usize {
        let stopped = self
            .members
            .iter()
            .filter(|m| self.retire_member(m, RetireReason::Stopped))
            .count();

        info!(stopped, "Fleet monitoring stopped");
        stopped
    }

    /// Stop a single member. Returns `false` if it was already retired.
    pub fn stop_member(&self, member_id: &MemberId) -> WatchdogResult<bool> {
        self.retire(member_id, RetireReason::Stopped)
    }

    /// Disconnect `member_id` and remove it from the active set.
    ///
    /// Returns `false` if it was already retired; the handle is not touched
    /// again in that case.
    pub fn retire(&self, member_id: &MemberId, reason: RetireReason) -> WatchdogResult<bool> {
        let member = self.member(member_id)?;
        Ok(self.retire_member(member, reason))
    }

    fn retire_member(&self, member: &Member, reason: RetireReason) -> bool {
        if !member.retire() {
            return false;
        }

        let last_state = member.snapshot().state();
        self.retired.insert(member.id().clone(), reason);

        info!(
            member_id = %member.id(),
            reason = %reason,
            last_state = ?last_state,
            "Member retired"
        );

        let _ = self.event_tx.send(FleetEvent::MemberRetired {
            member_id: member.id().clone(),
            reason,
            last_state,
            at: Utc::now(),
        });

        true
    }

    fn member(&self, member_id: &MemberId) -> WatchdogResult<&Arc<Member>> {
        self.index
            .get(member_id)
            .map(|&i| &self.members[i])
            .ok_or_else(|| WatchdogError::MemberNotFound(member_id.clone()))
    }
}

impl Drop for FleetSupervisor {
    fn drop(&mut self) {
        // Stop event actors; handles are left as they are.
        for member in &self.members {
            member.abort_actor();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedHandle;
    use fleetwatch_types::{ConnectionEvent, ConnectionState};

    fn fleet(n: usize) -> (FleetSupervisor, Vec<Arc<ScriptedHandle>>) {
        let handles: Vec<_> = (0..n).map(|_| ScriptedHandle::auto_connecting()).collect();
        let supervisor = FleetSupervisor::new(
            WatchdogConfig::default(),
            handles.iter().enumerate().map(|(i, h)| {
                (MemberId::indexed(i), h.clone() as Arc<dyn ConnectionHandle>)
            }),
        )
        .unwrap();
        (supervisor, handles)
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_duplicate_members_rejected() {
        let handle = ScriptedHandle::new();
        let result = FleetSupervisor::new(
            WatchdogConfig::default(),
            vec![
                (MemberId::new("a"), handle.clone() as Arc<dyn ConnectionHandle>),
                (MemberId::new("a"), handle as Arc<dyn ConnectionHandle>),
            ],
        );
        assert!(matches!(result, Err(WatchdogError::DuplicateMember(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WatchdogConfig::new(std::time::Duration::ZERO, std::time::Duration::ZERO);
        let result = FleetSupervisor::new(config, Vec::new());
        assert!(matches!(result, Err(WatchdogError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_start_is_lazy_and_idempotent() {
        let (supervisor, handles) = fleet(2);

        assert_eq!(supervisor.start(), 2);
        assert_eq!(supervisor.start(), 0);
        assert!(matches!(
            supervisor.start_member(&MemberId::indexed(0)),
            Err(WatchdogError::AlreadyStarted(_))
        ));

        settle().await;
        for handle in &handles {
            assert_eq!(handle.connect_count(), 0, "start must not connect eagerly");
        }
        assert_eq!(
            supervisor.phase(&MemberId::indexed(1)).unwrap(),
            MemberPhase::Monitoring
        );
    }

    #[tokio::test]
    async fn test_events_flow_through_policy() {
        let (supervisor, handles) = fleet(1);
        let mut events = supervisor.subscribe();
        supervisor.start();

        handles[0].emit(ConnectionEvent::WalletAdded {
            currency: "btc".to_string(),
        });
        settle().await;

        assert_eq!(handles[0].connect_count(), 1);
        let snapshot = supervisor.snapshot(&MemberId::indexed(0)).unwrap();
        assert_eq!(snapshot.state(), Some(ConnectionState::Connected));

        assert!(matches!(events.recv().await.unwrap(), FleetEvent::MemberStarted(_)));
        assert!(matches!(
            events.recv().await.unwrap(),
            FleetEvent::ConnectIssued { .. }
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_event_is_contained() {
        let (supervisor, handles) = fleet(1);
        let mut events = supervisor.subscribe();
        supervisor.start();

        handles[0].emit(ConnectionEvent::Unrecognized {
            discriminant: "42".to_string(),
        });
        handles[0].transition(ConnectionState::Syncing);
        settle().await;

        let snapshot = supervisor.snapshot(&MemberId::indexed(0)).unwrap();
        assert_eq!(snapshot.state(), Some(ConnectionState::Syncing));
        assert!(supervisor.is_active(&MemberId::indexed(0)));

        let _started = events.recv().await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            FleetEvent::EventRejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_retire_disconnects_once_and_never_reconnects() {
        let (supervisor, handles) = fleet(1);
        let id = MemberId::indexed(0);
        supervisor.start();

        handles[0].transition(ConnectionState::Connected);
        settle().await;

        assert!(supervisor.retire(&id, RetireReason::Stalled).unwrap());
        assert!(!supervisor.retire(&id, RetireReason::Stalled).unwrap());
        settle().await;

        // The DISCONNECTED caused by retirement is not answered.
        assert_eq!(handles[0].disconnect_count(), 1);
        assert_eq!(handles[0].connect_count(), 0);
        assert_eq!(handles[0].state(), ConnectionState::Disconnected);

        assert!(!supervisor.is_active(&id));
        assert_eq!(supervisor.retire_reason(&id), Some(RetireReason::Stalled));
        assert_eq!(supervisor.phase(&id).unwrap(), MemberPhase::Retired);
        assert!(matches!(
            supervisor.start_member(&id),
            Err(WatchdogError::AlreadyRetired(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_disconnects_each_active_member_once() {
        let (supervisor, handles) = fleet(3);
        supervisor.start();
        supervisor
            .retire(&MemberId::indexed(1), RetireReason::Stalled)
            .unwrap();

        assert_eq!(supervisor.stop(), 2);
        assert_eq!(supervisor.stop(), 0);

        for handle in &handles {
            assert_eq!(handle.disconnect_count(), 1);
        }
        assert_eq!(supervisor.active_count(), 0);
        assert_eq!(
            supervisor.retirements(),
            vec![
                (MemberId::indexed(0), RetireReason::Stopped),
                (MemberId::indexed(1), RetireReason::Stalled),
                (MemberId::indexed(2), RetireReason::Stopped),
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_covers_unstarted_members() {
        let (supervisor, handles) = fleet(1);
        assert_eq!(supervisor.stop(), 1);
        assert_eq!(handles[0].disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_taken_stream_retires_member() {
        let handle = ScriptedHandle::new();
        let _stolen = handle.subscribe();
        let supervisor = FleetSupervisor::new(
            WatchdogConfig::default(),
            vec![(MemberId::new("x"), handle.clone() as Arc<dyn ConnectionHandle>)],
        )
        .unwrap();

        assert_eq!(supervisor.start(), 0);
        assert_eq!(
            supervisor.retire_reason(&MemberId::new("x")),
            Some(RetireReason::SubscriptionFailed)
        );
        assert_eq!(supervisor.active_count(), 0);
    }

    #[test]
    fn test_unknown_member() {
        let (supervisor, _) = fleet(1);
        assert!(matches!(
            supervisor.retire(&MemberId::new("ghost"), RetireReason::Stopped),
            Err(WatchdogError::MemberNotFound(_))
        ));
        assert!(!supervisor.is_active(&MemberId::new("ghost")));
    }
}
