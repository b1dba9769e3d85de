//! # fleetwatch Watchdog - Reconnect policy and stall detection for connection fleets
//!
//! Supervises a fixed fleet of wallet-manager connections. Each connection
//! reports lifecycle changes on its own event stream; the watchdog keeps it
//! connected and retires it once it stops making progress.
//!
//! ## Key Components
//!
//! - [`ConnectionHandle`]: The connection contract (connect, disconnect, events)
//! - [`StateTracker`]: Last observed state and when it changed, per member
//! - [`ReconnectPolicy`]: Connects on new wallets, reconnects on DISCONNECTED
//! - [`StallDetector`]: No state change for longer than the window means stalled
//! - [`FleetSupervisor`]: Owns the members, starts, stops and retires them
//! - [`FleetPoller`]: Fixed-interval loop that retires stalled members
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fleetwatch_types::MemberId;
//! use fleetwatch_watchdog::{
//!     ConnectionHandle, FleetPoller, FleetSupervisor, TracingSink, WatchdogConfig,
//! };
//!
//! # async fn example(handles: Vec<Arc<dyn ConnectionHandle>>) {
//! let members = handles
//!     .into_iter()
//!     .enumerate()
//!     .map(|(i, handle)| (MemberId::indexed(i), handle));
//!
//! let supervisor = Arc::new(FleetSupervisor::new(WatchdogConfig::default(), members).unwrap());
//! supervisor.start();
//!
//! // Returns once every member has stalled or the fleet was stopped.
//! let poller = FleetPoller::new(supervisor.clone(), Arc::new(TracingSink));
//! let summary = poller.run().await;
//! println!("retired {} stalled members", summary.stalled.len());
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Each member's events are handled by one task that owns the member's
//! policy; the tracker is the only state it shares, with the poller, behind a
//! short lock. Retirement stops that task before disconnecting, so a retired
//! member is never reconnected.

pub mod config;
pub mod error;
pub mod events;
pub mod handle;
mod member;
pub mod policy;
pub mod poller;
pub mod report;
pub mod stall;
pub mod supervisor;
pub mod tracker;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export main types
pub use config::WatchdogConfig;
pub use error::{WatchdogError, WatchdogResult};
pub use events::{FleetEvent, RetireReason};
pub use handle::{event_channel, ConnectionHandle, EventSink, EventStream};
pub use member::MemberPhase;
pub use policy::{PolicyOutcome, ReconnectPolicy};
pub use poller::{FleetPoller, PollSummary};
pub use report::{MemorySink, Observation, ObservationSink, TracingSink};
pub use stall::{is_stalled, StallDetector};
pub use supervisor::{FleetSupervisor, MemberView};
pub use tracker::{StateChange, StateSnapshot, StateTracker};
