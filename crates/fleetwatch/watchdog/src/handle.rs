//! The connection contract consumed by the watchdog.
//!
//! A connection is opaque: the watchdog can ask it to connect or disconnect
//! and can take its event stream exactly once. Both calls are fire-and-forget;
//! their effect shows up later as `StateChanged` events.

use fleetwatch_types::{AddressScheme, ConnectionEvent};
use tokio::sync::mpsc;

/// Receiving side of a connection's event stream.
pub type EventStream = mpsc::UnboundedReceiver<ConnectionEvent>;

/// Sending side of a connection's event stream. Usable from any thread.
pub type EventSink = mpsc::UnboundedSender<ConnectionEvent>;

/// Create a connected sink/stream pair for a connection implementation.
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// One wallet-manager connection as seen by the supervisor.
pub trait ConnectionHandle: Send + Sync {
    /// Start connecting. Idempotent and non-blocking.
    fn connect(&self, scheme: Option<AddressScheme>);

    /// Tear the connection down. Idempotent and non-blocking.
    fn disconnect(&self);

    /// Take the event stream. Returns `None` once it has been handed out.
    fn subscribe(&self) -> Option<EventStream>;
}
