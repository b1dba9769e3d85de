//! Error types for fleetwatch-sim.

use thiserror::Error;

/// Errors produced by simulated connections and their query clients.
#[derive(Debug, Error)]
pub enum SimError {
    /// The query backend answered with a failure status.
    #[error("query failed with status {status}")]
    QueryFailed { status: u16 },

    /// Fault profile is inconsistent.
    #[error("invalid fault profile: {0}")]
    InvalidProfile(String),

    /// A simulated manager was created outside a Tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
