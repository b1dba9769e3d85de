//! Query backends used by simulated managers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::error::{SimError, SimResult};
use crate::faults::{FaultProfile, FAILURE_STATUS};

/// Blockchain data source a manager syncs against.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Fetch the current block height for `currency`.
    async fn fetch_block_height(&self, currency: &str) -> SimResult<u64>;
}

/// Client that delays every request and fails inside the profile's window.
pub struct FaultInjectingClient {
    profile: FaultProfile,
    created: Instant,
    height: AtomicU64,
}

impl FaultInjectingClient {
    pub fn new(profile: FaultProfile) -> SimResult<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            created: Instant::now(),
            height: AtomicU64::new(0),
        })
    }

    pub fn profile(&self) -> &FaultProfile {
        &self.profile
    }

    fn sample_latency(&self) -> Duration {
        let min = self.profile.latency_min;
        let max = self.profile.latency_max;
        if min >= max {
            return min;
        }
        let ms = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(ms)
    }
}

#[async_trait]
impl QueryClient for FaultInjectingClient {
    async fn fetch_block_height(&self, currency: &str) -> SimResult<u64> {
        let latency = self.sample_latency();
        if !latency.is_zero() {
            sleep(latency).await;
        }

        // Decided after the delay, when the response would come back.
        if self.profile.fails_at(self.created.elapsed()) {
            trace!(currency, latency_ms = latency.as_millis() as u64, "Injected query failure");
            return Err(SimError::QueryFailed {
                status: FAILURE_STATUS,
            });
        }

        Ok(self.height.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
