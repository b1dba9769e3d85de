//! fleetwatch Daemon - Soak run for a supervised wallet-manager fleet
//!
//! `fleetwatchd` builds a fleet of simulated managers on a fault-injecting
//! backend, keeps them connected with the fleet watchdog, retires members
//! that stall, and prints a summary once the run ends.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod runner;

use config::DaemonConfig;
use error::{DaemonError, DaemonResult};
use runner::SoakRun;

/// fleetwatch Daemon CLI
#[derive(Parser)]
#[command(name = "fleetwatchd")]
#[command(about = "fleetwatch - Soak run for a supervised wallet-manager fleet", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FLEETWATCH_CONFIG")]
    config: Option<String>,

    /// Number of managers in the fleet
    #[arg(short, long, env = "FLEETWATCH_MEMBERS")]
    members: Option<usize>,

    /// Stop the fleet after this many seconds (0 runs until Ctrl-C or drain)
    #[arg(long, env = "FLEETWATCH_RUN_TIME_SECS")]
    run_time_secs: Option<u64>,

    /// Log level
    #[arg(long, env = "FLEETWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging and a JSON summary
    #[arg(long, env = "FLEETWATCH_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(members) = cli.members {
        config.fleet.size = members;
    }
    if let Some(secs) = cli.run_time_secs {
        config.run.run_time_secs = Some(secs);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let json = config.logging.json;
    let report = SoakRun::new(config).run_until(runner::ctrl_c()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
