//! Simulated wallet manager.
//!
//! A manager syncs one wallet currency against a [`QueryClient`]. `connect`
//! starts a session task that keeps trying until a query succeeds, then
//! syncs on a fixed interval; a failed sync drops the connection and ends
//! the session. Every real state transition is reported on the event
//! stream, in order.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_types::{AddressScheme, ConnectionEvent, ConnectionState, MemberId};
use fleetwatch_watchdog::{event_channel, ConnectionHandle, EventSink, EventStream};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, trace};

use crate::error::{SimError, SimResult};
use crate::faults::FaultProfile;
use crate::query::QueryClient;

/// Currencies a manager creates wallets for; other networks are skipped.
pub const SUPPORTED_CURRENCIES: [&str; 2] = ["btc", "bch"];

#[derive(Debug, Clone, Copy)]
struct SessionTiming {
    retry_delay: Duration,
    sync_interval: Duration,
}

struct Session {
    state: ConnectionState,
    /// Bumped on every connect/disconnect; stale session tasks compare against it.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    id: MemberId,
    events: EventSink,
    session: Mutex<Session>,
    wallets: Mutex<Vec<String>>,
}

impl Inner {
    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session.lock().generation == generation
    }

    /// Move to `new` if `generation` still owns the session.
    fn transition(&self, generation: u64, new: ConnectionState) -> bool {
        let mut session = self.session.lock();
        if session.generation != generation {
            return false;
        }
        Self::apply(&self.events, &mut session, new)
    }

    /// Release the session slot and move to `new`, so a reconnect issued in
    /// response to the change starts a fresh session.
    fn end_session(&self, generation: u64, new: ConnectionState) {
        let mut session = self.session.lock();
        if session.generation != generation {
            return;
        }
        session.task = None;
        Self::apply(&self.events, &mut session, new);
    }

    fn apply(events: &EventSink, session: &mut Session, new: ConnectionState) -> bool {
        if session.state == new || session.state.is_terminal() {
            return false;
        }
        let old = std::mem::replace(&mut session.state, new);
        let _ = events.send(ConnectionEvent::state_changed(old, new));
        true
    }

    fn sync_currency(&self) -> String {
        self.wallets
            .lock()
            .first()
            .cloned()
            .unwrap_or_else(|| SUPPORTED_CURRENCIES[0].to_string())
    }
}

/// In-process wallet manager implementing [`ConnectionHandle`].
pub struct SimulatedManager {
    inner: Arc<Inner>,
    client: Arc<dyn QueryClient>,
    timing: SessionTiming,
    runtime: Handle,
    stream: Mutex<Option<EventStream>>,
}

impl SimulatedManager {
    /// Create a manager in CREATED state. Must be called within a Tokio
    /// runtime; sessions are spawned onto it.
    pub fn new(
        id: MemberId,
        client: Arc<dyn QueryClient>,
        profile: &FaultProfile,
    ) -> SimResult<Arc<Self>> {
        profile.validate()?;
        let runtime = Handle::try_current().map_err(|e| SimError::NoRuntime(e.to_string()))?;
        let (events, stream) = event_channel();

        Ok(Arc::new(Self {
            inner: Arc::new(Inner {
                id,
                events,
                session: Mutex::new(Session {
                    state: ConnectionState::Created,
                    generation: 0,
                    task: None,
                }),
                wallets: Mutex::new(Vec::new()),
            }),
            client,
            timing: SessionTiming {
                retry_delay: profile.retry_delay,
                sync_interval: profile.sync_interval,
            },
            runtime,
            stream: Mutex::new(Some(stream)),
        }))
    }

    pub fn id(&self) -> &MemberId {
        &self.inner.id
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().state
    }

    pub fn wallets(&self) -> Vec<String> {
        self.inner.wallets.lock().clone()
    }

    /// Announce the manager and add a wallet for each supported network.
    /// Returns the number of wallets added.
    pub fn configure(&self, networks: &[&str]) -> usize {
        self.inner.emit(ConnectionEvent::Created);

        let mut added = 0;
        for network in networks {
            let currency = network.to_ascii_lowercase();
            if !SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
                trace!(manager = %self.inner.id, network, "Skipping unsupported network");
                continue;
            }
            {
                let mut wallets = self.inner.wallets.lock();
                if wallets.contains(&currency) {
                    continue;
                }
                wallets.push(currency.clone());
            }
            self.inner.emit(ConnectionEvent::WalletAdded { currency });
            added += 1;
        }

        debug!(manager = %self.inner.id, added, "Manager configured");
        added
    }

    /// Tear down and move to the terminal DELETED state.
    pub fn delete(&self) {
        self.shutdown(ConnectionState::Deleted);
        info!(manager = %self.inner.id, "Manager deleted");
    }

    fn shutdown(&self, target: ConnectionState) {
        let task = {
            let mut session = self.inner.session.lock();
            session.generation += 1;
            let task = session.task.take();
            Inner::apply(&self.inner.events, &mut session, target);
            task
        };

        if let Some(task) = task {
            task.abort();
        }
    }
}

impl ConnectionHandle for SimulatedManager {
    fn connect(&self, scheme: Option<AddressScheme>) {
        let mut session = self.inner.session.lock();
        if session.state.is_terminal() {
            debug!(manager = %self.inner.id, "Ignoring connect on deleted manager");
            return;
        }
        if session.task.as_ref().is_some_and(|task| !task.is_finished()) {
            trace!(manager = %self.inner.id, "Session already running");
            return;
        }

        session.generation += 1;
        let generation = session.generation;
        debug!(
            manager = %self.inner.id,
            generation,
            scheme = ?scheme,
            "Starting session"
        );

        session.task = Some(self.runtime.spawn(run_session(
            self.inner.clone(),
            self.client.clone(),
            self.timing,
            generation,
        )));
    }

    fn disconnect(&self) {
        self.shutdown(ConnectionState::Disconnected);
    }

    fn subscribe(&self) -> Option<EventStream> {
        self.stream.lock().take()
    }
}

impl Drop for SimulatedManager {
    fn drop(&mut self) {
        if let Some(task) = self.inner.session.lock().task.take() {
            task.abort();
        }
    }
}

async fn run_session(
    inner: Arc<Inner>,
    client: Arc<dyn QueryClient>,
    timing: SessionTiming,
    generation: u64,
) {
    let currency = inner.sync_currency();

    loop {
        match client.fetch_block_height(&currency).await {
            Ok(height) => {
                if !inner.is_current(generation) {
                    return;
                }
                inner.transition(generation, ConnectionState::Connected);
                inner.emit(ConnectionEvent::Network {
                    detail: format!("{} height {}", currency, height),
                });
                break;
            }
            Err(e) => {
                debug!(manager = %inner.id, error = %e, "Connect attempt failed");
                sleep(timing.retry_delay).await;
            }
        }
    }

    loop {
        sleep(timing.sync_interval).await;
        if !inner.transition(generation, ConnectionState::Syncing) {
            return;
        }
        inner.emit(ConnectionEvent::SyncProgress { percent: 0.0 });

        match client.fetch_block_height(&currency).await {
            Ok(height) => {
                inner.emit(ConnectionEvent::Network {
                    detail: format!("{} height {}", currency, height),
                });
                inner.emit(ConnectionEvent::SyncProgress { percent: 100.0 });
                if !inner.transition(generation, ConnectionState::Connected) {
                    return;
                }
            }
            Err(e) => {
                debug!(manager = %inner.id, error = %e, "Sync failed, dropping connection");
                inner.end_session(generation, ConnectionState::Disconnected);
                return;
            }
        }
    }
}
