//! Error types for fleetwatch-daemon

use fleetwatch_sim::SimError;
use fleetwatch_watchdog::WatchdogError;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fleet construction or supervision error
    #[error("Watchdog error: {0}")]
    Watchdog(#[from] WatchdogError),

    /// Simulated backend error
    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background task failed
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
