//! Test doubles for exercising the watchdog without a real wallet manager.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fleetwatch_types::{AddressScheme, ConnectionEvent, ConnectionState};
use parking_lot::Mutex;

use crate::handle::{event_channel, ConnectionHandle, EventSink, EventStream};

/// A `ConnectionHandle` whose events are injected by the test.
///
/// Every `connect`/`disconnect` call is counted. In auto-connect mode a
/// `connect` on a disconnected handle immediately reports CONNECTED, the
/// way a healthy connection would a moment later.
pub struct ScriptedHandle {
    sink: EventSink,
    stream: Mutex<Option<EventStream>>,
    state: Mutex<ConnectionState>,
    auto_connect: bool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    schemes: Mutex<Vec<Option<AddressScheme>>>,
}

impl ScriptedHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    pub fn auto_connecting() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    fn build(auto_connect: bool) -> Self {
        let (sink, stream) = event_channel();
        Self {
            sink,
            stream: Mutex::new(Some(stream)),
            state: Mutex::new(ConnectionState::Created),
            auto_connect,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            schemes: Mutex::new(Vec::new()),
        }
    }

    /// Push a raw event onto the stream.
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.sink.send(event);
    }

    /// Move to `new` and report the change. No event if already there.
    pub fn transition(&self, new: ConnectionState) {
        let mut state = self.state.lock();
        if *state == new {
            return;
        }
        let old = std::mem::replace(&mut *state, new);
        let _ = self.sink.send(ConnectionEvent::state_changed(old, new));
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Scheme passed to the latest `connect`, if any was made.
    pub fn last_scheme(&self) -> Option<Option<AddressScheme>> {
        self.schemes.lock().last().copied()
    }
}

impl ConnectionHandle for ScriptedHandle {
    fn connect(&self, scheme: Option<AddressScheme>) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.schemes.lock().push(scheme);

        if self.auto_connect && !self.state().is_connected() {
            self.transition(ConnectionState::Connected);
        }
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.transition(ConnectionState::Disconnected);
    }

    fn subscribe(&self) -> Option<EventStream> {
        self.stream.lock().take()
    }
}
