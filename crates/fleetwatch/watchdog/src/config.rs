//! Watchdog configuration.

use std::time::Duration;

use fleetwatch_types::AddressScheme;
use serde::{Deserialize, Serialize};

use crate::error::{WatchdogError, WatchdogResult};
use crate::stall::StallDetector;

/// Configuration for the fleet supervisor and poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Delay between two poll ticks.
    pub poll_interval: Duration,

    /// A member whose last state change is older than this is stalled.
    pub stall_window: Duration,

    /// Hint passed to every `connect` the reconnect policy issues.
    pub address_scheme: Option<AddressScheme>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            stall_window: Duration::from_secs(120),
            address_scheme: None,
        }
    }
}

impl WatchdogConfig {
    pub fn new(poll_interval: Duration, stall_window: Duration) -> Self {
        Self {
            poll_interval,
            stall_window,
            ..Default::default()
        }
    }

    pub fn with_address_scheme(mut self, scheme: AddressScheme) -> Self {
        self.address_scheme = Some(scheme);
        self
    }

    /// Reject configurations the poller cannot run with.
    pub fn validate(&self) -> WatchdogResult<()> {
        if self.poll_interval.is_zero() {
            return Err(WatchdogError::ConfigurationError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.stall_window.is_zero() {
            return Err(WatchdogError::ConfigurationError(
                "stall window must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stall_detector(&self) -> StallDetector {
        StallDetector::new(self.stall_window)
    }
}
