//! Stall detection.
//!
//! A member is stalled when it has reported at least one state change and the
//! newest one is strictly older than the window. Members that never reported
//! anything are still setting up and are never stalled.

use std::time::Duration;

use tokio::time::Instant;

use crate::tracker::StateSnapshot;

/// Decide whether `snapshot` is stalled at `now` for the given `window`.
pub fn is_stalled(snapshot: &StateSnapshot, now: Instant, window: Duration) -> bool {
    match snapshot.timestamp() {
        Some(changed_at) => now.saturating_duration_since(changed_at) > window,
        None => false,
    }
}

/// Stall rule bound to a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallDetector {
    window: Duration,
}

impl StallDetector {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_stalled(&self, snapshot: &StateSnapshot, now: Instant) -> bool {
        is_stalled(snapshot, now, self.window)
    }
}

impl Default for StallDetector {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_types::ConnectionState;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_secs(120);

    #[test]
    fn test_reference_scenario() {
        let detector = StallDetector::default();
        let t0 = Instant::now();
        let snapshot = StateSnapshot::at(ConnectionState::Connected, t0);

        assert!(!detector.is_stalled(&snapshot, t0 + Duration::from_secs(110)));
        assert!(!detector.is_stalled(&snapshot, t0 + Duration::from_secs(120)));
        assert!(detector.is_stalled(&snapshot, t0 + Duration::from_secs(130)));
    }

    #[test]
    fn test_boundary_is_not_stalled() {
        let t0 = Instant::now();
        let snapshot = StateSnapshot::at(ConnectionState::Syncing, t0);

        assert!(!is_stalled(&snapshot, t0 + WINDOW, WINDOW));
        assert!(is_stalled(
            &snapshot,
            t0 + WINDOW + Duration::from_nanos(1),
            WINDOW
        ));
    }

    #[test]
    fn test_clock_behind_snapshot_is_not_stalled() {
        let t0 = Instant::now();
        let snapshot = StateSnapshot::at(ConnectionState::Connected, t0 + Duration::from_secs(5));
        assert!(!is_stalled(&snapshot, t0, WINDOW));
    }

    proptest! {
        #[test]
        fn never_changed_member_is_never_stalled(elapsed_secs in 0u64..1_000_000, window_secs in 1u64..10_000) {
            let now = Instant::now() + Duration::from_secs(elapsed_secs);
            prop_assert!(!is_stalled(&StateSnapshot::initial(), now, Duration::from_secs(window_secs)));
        }

        #[test]
        fn stalled_iff_elapsed_exceeds_window(elapsed_ms in 0u64..1_000_000, window_ms in 1u64..500_000) {
            let t0 = Instant::now();
            let snapshot = StateSnapshot::at(ConnectionState::Connected, t0);
            let now = t0 + Duration::from_millis(elapsed_ms);

            prop_assert_eq!(
                is_stalled(&snapshot, now, Duration::from_millis(window_ms)),
                elapsed_ms > window_ms
            );
        }
    }
}
