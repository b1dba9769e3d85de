//! End-to-end fleet scenarios on a paused clock.
//!
//! Window 120s, interval 10s throughout.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_types::{ConnectionState, MemberId};
use fleetwatch_watchdog::testing::ScriptedHandle;
use fleetwatch_watchdog::{
    ConnectionHandle, FleetPoller, FleetSupervisor, MemorySink, RetireReason, WatchdogConfig,
};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

const INTERVAL: Duration = Duration::from_secs(10);
const WINDOW: Duration = Duration::from_secs(120);
const CYCLE: Duration = Duration::from_secs(30);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn supervise(handles: &[Arc<ScriptedHandle>]) -> Arc<FleetSupervisor> {
    let members = handles
        .iter()
        .enumerate()
        .map(|(i, h)| (MemberId::indexed(i), h.clone() as Arc<dyn ConnectionHandle>));
    Arc::new(FleetSupervisor::new(WatchdogConfig::new(INTERVAL, WINDOW), members).unwrap())
}

/// Let member actors drain their queues without moving the clock.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Drop the connection every `CYCLE`; the reconnect policy brings it back.
fn cycle_forever(handle: Arc<ScriptedHandle>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            time::sleep(CYCLE).await;
            handle.transition(ConnectionState::Disconnected);
        }
    })
}

#[tokio::test(start_paused = true)]
async fn member_silent_after_connect_is_retired_once_window_passes() {
    init_tracing();
    let handle = ScriptedHandle::new();
    let supervisor = supervise(std::slice::from_ref(&handle));
    let id = MemberId::indexed(0);
    supervisor.start();

    let t0 = Instant::now();
    handle.transition(ConnectionState::Connected);
    settle().await;
    assert_eq!(
        supervisor.snapshot(&id).unwrap().timestamp(),
        Some(t0),
        "change recorded at t=0"
    );

    let sink = Arc::new(MemorySink::new());
    let poller = FleetPoller::new(supervisor.clone(), sink.clone());
    let run = tokio::spawn(async move { poller.run().await });

    time::sleep(Duration::from_secs(110)).await;
    settle().await;
    assert!(supervisor.is_active(&id), "still active at t=110s");

    let summary = run.await.unwrap();
    assert_eq!(t0.elapsed(), Duration::from_secs(130));
    assert_eq!(summary.ticks, 13);
    assert_eq!(summary.stalled, vec![id.clone()]);

    // t=120s sits on the boundary and is not a stall.
    let history = sink.history(&id);
    assert!(history[11].active);
    assert!(!history[12].active);

    assert_eq!(supervisor.retire_reason(&id), Some(RetireReason::Stalled));
    assert_eq!(handle.disconnect_count(), 1);
    assert_eq!(handle.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn member_cycling_through_reconnects_is_never_retired() {
    init_tracing();
    let handle = ScriptedHandle::auto_connecting();
    let supervisor = supervise(std::slice::from_ref(&handle));
    let id = MemberId::indexed(0);
    supervisor.start();

    handle.transition(ConnectionState::Connected);
    settle().await;
    let driver = cycle_forever(handle.clone());

    let poller = FleetPoller::new(supervisor.clone(), Arc::new(MemorySink::new()));
    let outcome = time::timeout(Duration::from_secs(30 * 60), poller.run()).await;

    assert!(outcome.is_err(), "poller must keep running");
    // A drop lands exactly at the deadline; let the reconnect through.
    settle().await;
    assert!(supervisor.is_active(&id));
    assert!(handle.connect_count() >= 59);
    assert_eq!(handle.disconnect_count(), 0);
    assert_eq!(handle.state(), ConnectionState::Connected);

    driver.abort();
    supervisor.stop();
}

#[tokio::test(start_paused = true)]
async fn one_stalled_member_does_not_end_the_fleet() {
    init_tracing();
    let stalling = ScriptedHandle::new();
    let cycling = [
        ScriptedHandle::auto_connecting(),
        ScriptedHandle::auto_connecting(),
    ];
    let handles = vec![stalling.clone(), cycling[0].clone(), cycling[1].clone()];
    let supervisor = supervise(&handles);
    supervisor.start();

    let t0 = Instant::now();
    for handle in &handles {
        handle.transition(ConnectionState::Connected);
    }
    settle().await;
    let drivers: Vec<_> = cycling.iter().map(|h| cycle_forever(h.clone())).collect();

    let poller = FleetPoller::new(supervisor.clone(), Arc::new(MemorySink::new()));
    let run = tokio::spawn(async move { poller.run().await });

    time::sleep_until(t0 + Duration::from_secs(135)).await;
    settle().await;
    assert!(!supervisor.is_active(&MemberId::indexed(0)));
    assert_eq!(supervisor.active_count(), 2);

    time::sleep_until(t0 + Duration::from_secs(305)).await;
    settle().await;
    assert!(!run.is_finished(), "two members are still cycling");
    assert_eq!(supervisor.active_count(), 2);

    assert_eq!(supervisor.stop(), 2);
    let connects: Vec<_> = cycling.iter().map(|h| h.connect_count()).collect();

    let summary = run.await.unwrap();
    assert_eq!(summary.ticks, 31);
    assert_eq!(summary.stalled, vec![MemberId::indexed(0)]);
    assert_eq!(
        supervisor.retirements(),
        vec![
            (MemberId::indexed(0), RetireReason::Stalled),
            (MemberId::indexed(1), RetireReason::Stopped),
            (MemberId::indexed(2), RetireReason::Stopped),
        ]
    );

    // Drivers keep dropping the connections; nobody answers any more.
    time::sleep(Duration::from_secs(120)).await;
    settle().await;
    for (handle, before) in cycling.iter().zip(connects) {
        assert_eq!(handle.connect_count(), before);
        assert_eq!(handle.disconnect_count(), 1);
    }
    assert_eq!(stalling.disconnect_count(), 1);

    for driver in drivers {
        driver.abort();
    }
}
