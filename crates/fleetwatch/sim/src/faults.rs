//! Fault injection settings for simulated query backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Status code returned while the failure window is open.
pub const FAILURE_STATUS: u16 = 525;

/// Latency and failure behaviour of a simulated backend, plus the timing of
/// the manager sessions built on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultProfile {
    /// Lower bound of the per-request latency.
    pub latency_min: Duration,

    /// Upper bound of the per-request latency.
    pub latency_max: Duration,

    /// Time after client creation before failures start.
    pub fail_delay: Duration,

    /// Length of the failure window. Zero disables failures.
    pub fail_period: Duration,

    /// Pause between connection attempts while connecting.
    pub retry_delay: Duration,

    /// Pause between two syncs of a connected manager.
    pub sync_interval: Duration,
}

impl Default for FaultProfile {
    fn default() -> Self {
        Self {
            latency_min: Duration::from_secs(5),
            latency_max: Duration::from_secs(40),
            fail_delay: Duration::from_secs(5 * 60),
            fail_period: Duration::from_secs(5 * 60),
            retry_delay: Duration::from_secs(30),
            sync_interval: Duration::from_secs(60),
        }
    }
}

impl FaultProfile {
    /// A backend that answers instantly and never fails.
    pub fn none() -> Self {
        Self {
            latency_min: Duration::ZERO,
            latency_max: Duration::ZERO,
            fail_delay: Duration::ZERO,
            fail_period: Duration::ZERO,
            retry_delay: Duration::from_secs(1),
            sync_interval: Duration::from_secs(60),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.latency_min > self.latency_max {
            return Err(SimError::InvalidProfile(format!(
                "latency_min ({:?}) exceeds latency_max ({:?})",
                self.latency_min, self.latency_max
            )));
        }
        if self.sync_interval.is_zero() || self.retry_delay.is_zero() {
            return Err(SimError::InvalidProfile(
                "sync_interval and retry_delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a request issued `elapsed` after client creation fails.
    /// Both ends of the window are inclusive.
    pub fn fails_at(&self, elapsed: Duration) -> bool {
        !self.fail_period.is_zero()
            && elapsed >= self.fail_delay
            && elapsed <= self.fail_delay + self.fail_period
    }
}
