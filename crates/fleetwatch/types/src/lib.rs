//! fleetwatch Types - Vocabulary shared by the fleet watchdog and its connections
//!
//! A fleet is a fixed set of wallet-manager connections. Each connection reports
//! lifecycle changes asynchronously; the watchdog reacts to them and retires
//! connections that stop making progress.
//!
//! ## Key Concepts
//!
//! - **MemberId**: Identity of one supervised connection
//! - **ConnectionState**: Lifecycle discriminant reported by a connection
//! - **ConnectionEvent**: One notification on a connection's event stream
//! - **AddressScheme**: Hint passed through `connect`

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod events;
pub mod ids;
pub mod state;

pub use events::{ConnectionEvent, EventKind};
pub use ids::MemberId;
pub use state::{AddressScheme, ConnectionState, UnknownStateError};
