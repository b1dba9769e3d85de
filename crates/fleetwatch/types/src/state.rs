//! Connection lifecycle states and connect hints

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state reported by a wallet-manager connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Created,
    Connected,
    Disconnected,
    Syncing,
    Deleted,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 5] = [
        ConnectionState::Created,
        ConnectionState::Connected,
        ConnectionState::Disconnected,
        ConnectionState::Syncing,
        ConnectionState::Deleted,
    ];

    /// Uppercase label as printed in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Created => "CREATED",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Syncing => "SYNCING",
            ConnectionState::Deleted => "DELETED",
        }
    }

    /// Whether the connection already holds (or is using) a live session.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Syncing)
    }

    /// DELETED is the only state a connection never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Deleted)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A state label that does not name any known [`ConnectionState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown connection state: {0}")]
pub struct UnknownStateError(pub String);

impl FromStr for ConnectionState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionState::ALL
            .iter()
            .copied()
            .find(|state| state.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStateError(s.to_string()))
    }
}

/// Address scheme hint handed to `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressScheme {
    BtcLegacy,
    BtcSegwit,
    Native,
}

impl fmt::Display for AddressScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressScheme::BtcLegacy => write!(f, "btc-legacy"),
            AddressScheme::BtcSegwit => write!(f, "btc-segwit"),
            AddressScheme::Native => write!(f, "native"),
        }
    }
}
