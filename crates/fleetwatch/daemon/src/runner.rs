//! Soak run: build a simulated fleet, supervise it, stop it, report.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetwatch_sim::{FaultInjectingClient, SimulatedManager};
use fleetwatch_types::{ConnectionState, MemberId};
use fleetwatch_watchdog::{
    ConnectionHandle, FleetEvent, FleetPoller, FleetSupervisor, PollSummary, RetireReason,
    TracingSink,
};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonResult;

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    /// Every member stalled before anything stopped the fleet.
    Drained,
    /// The configured run time elapsed.
    RunTimeElapsed,
    /// Shutdown was requested (Ctrl-C).
    Interrupted,
}

/// Final state of one member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub member_id: MemberId,
    pub last_state: Option<ConnectionState>,
    pub last_change: Option<DateTime<Utc>>,
    pub retired: Option<RetireReason>,
}

/// Summary printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub cause: StopCause,
    pub ticks: u64,
    pub stalled: Vec<MemberId>,
    pub stopped: usize,
    pub connects_issued: u64,
    pub events_rejected: u64,
    pub members: Vec<MemberReport>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "fleet run ended ({:?}) after {}s, {} ticks",
            self.cause, self.elapsed_secs, self.ticks
        )?;
        writeln!(
            f,
            "  stalled: {}  stopped: {}  connects: {}  rejected events: {}",
            self.stalled.len(),
            self.stopped,
            self.connects_issued,
            self.events_rejected
        )?;
        for member in &self.members {
            let state = member.last_state.map(|s| s.label()).unwrap_or("-");
            let retired = member
                .retired
                .map(|r| r.to_string())
                .unwrap_or_else(|| "active".to_string());
            writeln!(f, "  {:<12} -> {:<12} {}", member.member_id, state, retired)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Tally {
    connects_issued: u64,
    events_rejected: u64,
    lagged: u64,
}

/// Count fleet events until the supervisor goes away.
async fn tally(mut events: broadcast::Receiver<FleetEvent>) -> Tally {
    let mut tally = Tally::default();
    loop {
        match events.recv().await {
            Ok(FleetEvent::ConnectIssued { .. }) => tally.connects_issued += 1,
            Ok(FleetEvent::EventRejected { .. }) => tally.events_rejected += 1,
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => tally.lagged += missed,
            Err(RecvError::Closed) => return tally,
        }
    }
}

async fn run_timer(run_time: Option<Duration>) {
    match run_time {
        Some(run_time) => tokio::time::sleep(run_time).await,
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

enum Finish {
    Drained(Result<PollSummary, tokio::task::JoinError>),
    Stop(StopCause),
}

/// One soak run over a simulated fleet.
pub struct SoakRun {
    config: DaemonConfig,
}

impl SoakRun {
    pub fn new(config: DaemonConfig) -> Self {
        Self { config }
    }

    /// Run until every member stalled, the run time elapsed, or `shutdown`
    /// resolved. Stopping retires the remaining members; the poller then
    /// ends on its next tick.
    pub async fn run_until<F>(self, shutdown: F) -> DaemonResult<RunReport>
    where
        F: Future<Output = ()>,
    {
        self.config.validate()?;
        let watchdog = self.config.watchdog_config()?;
        let profile = self.config.fault_profile();
        let networks: Vec<&str> = self.config.fleet.networks.iter().map(String::as_str).collect();

        let mut managers = Vec::with_capacity(self.config.fleet.size);
        for i in 0..self.config.fleet.size {
            let client = Arc::new(FaultInjectingClient::new(profile.clone())?);
            managers.push(SimulatedManager::new(MemberId::indexed(i), client, &profile)?);
        }

        let supervisor = Arc::new(FleetSupervisor::new(
            watchdog,
            managers
                .iter()
                .map(|m| (m.id().clone(), m.clone() as Arc<dyn ConnectionHandle>)),
        )?);
        let tally_task = tokio::spawn(tally(supervisor.subscribe()));

        let started_at = Utc::now();
        let clock = Instant::now();
        let started = supervisor.start();
        for manager in &managers {
            manager.configure(&networks);
        }
        info!(
            members = supervisor.len(),
            started,
            networks = ?networks,
            run_time_secs = ?self.config.run_time().map(|d| d.as_secs()),
            "Fleet started"
        );

        let poller = FleetPoller::new(supervisor.clone(), Arc::new(TracingSink));
        let mut poll_task = tokio::spawn(async move { poller.run().await });

        let finish = tokio::select! {
            joined = &mut poll_task => Finish::Drained(joined),
            _ = run_timer(self.config.run_time()) => Finish::Stop(StopCause::RunTimeElapsed),
            _ = shutdown => Finish::Stop(StopCause::Interrupted),
        };

        let (cause, summary, stopped) = match finish {
            Finish::Drained(joined) => (StopCause::Drained, joined?, 0),
            Finish::Stop(cause) => {
                let stopped = supervisor.stop();
                info!(?cause, stopped, "Fleet stopped");
                (cause, poll_task.await?, stopped)
            }
        };

        let members = supervisor
            .views()
            .into_iter()
            .map(|view| MemberReport {
                retired: supervisor.retire_reason(&view.member_id),
                last_state: view.snapshot.state(),
                last_change: view.snapshot.changed_at(),
                member_id: view.member_id,
            })
            .collect();

        drop(supervisor);
        let tally = tally_task.await?;
        if tally.lagged > 0 {
            warn!(missed = tally.lagged, "Fleet event counter lagged");
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            elapsed_secs: clock.elapsed().as_secs(),
            cause,
            ticks: summary.ticks,
            stalled: summary.stalled,
            stopped,
            connects_issued: tally.connects_issued,
            events_rejected: tally.events_rejected,
            members,
        };
        info!(
            cause = ?report.cause,
            ticks = report.ticks,
            stalled = report.stalled.len(),
            stopped = report.stopped,
            "Fleet run finished"
        );
        Ok(report)
    }
}
