//! fleetwatch Sim - In-process wallet-manager connections for soak runs
//!
//! [`SimulatedManager`] implements the watchdog's `ConnectionHandle` on top of
//! a [`QueryClient`]. The [`FaultInjectingClient`] adds latency to every
//! request and fails all requests during a configurable window, which is
//! enough to push managers into reconnect loops and stalls.

pub mod error;
pub mod faults;
pub mod manager;
pub mod query;

pub use error::{SimError, SimResult};
pub use faults::FaultProfile;
pub use manager::{SimulatedManager, SUPPORTED_CURRENCIES};
pub use query::{FaultInjectingClient, QueryClient};
