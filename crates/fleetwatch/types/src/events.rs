//! Events delivered on a connection's event stream
//!
//! Only `WalletAdded` and `StateChanged` drive the watchdog. The remaining
//! variants are carried so a connection can forward its whole stream without
//! filtering; the watchdog ignores them.

use crate::state::ConnectionState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One notification from a wallet-manager connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// The connection object was created.
    Created,

    /// A wallet was attached to the connection.
    WalletAdded { currency: String },

    /// The connection moved between lifecycle states.
    StateChanged {
        old: ConnectionState,
        new: ConnectionState,
    },

    /// Sync progress reported by the manager.
    SyncProgress { percent: f32 },

    /// Wallet-level activity (balance, fee basis, ...).
    Wallet { currency: String, detail: String },

    /// Transfer-level activity.
    Transfer { currency: String, detail: String },

    /// Network-level activity (height, fees, ...).
    Network { detail: String },

    /// A discriminant the producer could not map onto this vocabulary.
    Unrecognized { discriminant: String },
}

/// Coarse classification used in logs and fleet events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    WalletAdded,
    StateChanged,
    SyncProgress,
    Wallet,
    Transfer,
    Network,
    Unrecognized,
}

impl ConnectionEvent {
    pub fn state_changed(old: ConnectionState, new: ConnectionState) -> Self {
        ConnectionEvent::StateChanged { old, new }
    }

    /// Build a state change from raw labels, as reported by an engine that
    /// speaks strings. Unknown labels yield [`ConnectionEvent::Unrecognized`].
    pub fn state_changed_from_labels(old: &str, new: &str) -> Self {
        match (old.parse::<ConnectionState>(), new.parse::<ConnectionState>()) {
            (Ok(old), Ok(new)) => ConnectionEvent::StateChanged { old, new },
            (Err(e), _) | (_, Err(e)) => ConnectionEvent::Unrecognized {
                discriminant: e.0,
            },
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ConnectionEvent::Created => EventKind::Created,
            ConnectionEvent::WalletAdded { .. } => EventKind::WalletAdded,
            ConnectionEvent::StateChanged { .. } => EventKind::StateChanged,
            ConnectionEvent::SyncProgress { .. } => EventKind::SyncProgress,
            ConnectionEvent::Wallet { .. } => EventKind::Wallet,
            ConnectionEvent::Transfer { .. } => EventKind::Transfer,
            ConnectionEvent::Network { .. } => EventKind::Network,
            ConnectionEvent::Unrecognized { .. } => EventKind::Unrecognized,
        }
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Created => write!(f, "Created"),
            ConnectionEvent::WalletAdded { currency } => write!(f, "WalletAdded({})", currency),
            ConnectionEvent::StateChanged { old, new } => {
                write!(f, "StateChanged({} -> {})", old, new)
            }
            ConnectionEvent::SyncProgress { percent } => write!(f, "SyncProgress({:.1}%)", percent),
            ConnectionEvent::Wallet { currency, detail } => {
                write!(f, "Wallet({}: {})", currency, detail)
            }
            ConnectionEvent::Transfer { currency, detail } => {
                write!(f, "Transfer({}: {})", currency, detail)
            }
            ConnectionEvent::Network { detail } => write!(f, "Network({})", detail),
            ConnectionEvent::Unrecognized { discriminant } => {
                write!(f, "Unrecognized({})", discriminant)
            }
        }
    }
}
