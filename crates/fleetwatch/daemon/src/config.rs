//! Configuration for fleetwatch-daemon

use std::time::Duration;

use fleetwatch_sim::{FaultProfile, SUPPORTED_CURRENCIES};
use fleetwatch_types::AddressScheme;
use fleetwatch_watchdog::WatchdogConfig;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, DaemonResult};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Fleet configuration
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Watchdog timing
    #[serde(default)]
    pub watchdog: WatchdogSettings,

    /// Simulated backend faults
    #[serde(default)]
    pub faults: FaultSettings,

    /// Run bounds
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Number of managers to supervise
    #[serde(default = "default_fleet_size")]
    pub size: usize,

    /// Networks each manager creates wallets for
    #[serde(default = "default_networks")]
    pub networks: Vec<String>,

    /// Address scheme passed on every connect
    #[serde(default)]
    pub address_scheme: Option<AddressScheme>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            size: default_fleet_size(),
            networks: default_networks(),
            address_scheme: None,
        }
    }
}

/// Watchdog timing, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_stall_window")]
    pub stall_window_secs: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            stall_window_secs: default_stall_window(),
        }
    }
}

/// Simulated backend faults, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultSettings {
    pub latency_min_secs: u64,
    pub latency_max_secs: u64,
    pub fail_delay_secs: u64,
    /// Zero disables failures
    pub fail_period_secs: u64,
    pub retry_delay_secs: u64,
    pub sync_interval_secs: u64,
}

impl Default for FaultSettings {
    fn default() -> Self {
        let profile = FaultProfile::default();
        Self {
            latency_min_secs: profile.latency_min.as_secs(),
            latency_max_secs: profile.latency_max.as_secs(),
            fail_delay_secs: profile.fail_delay.as_secs(),
            fail_period_secs: profile.fail_period.as_secs(),
            retry_delay_secs: profile.retry_delay.as_secs(),
            sync_interval_secs: profile.sync_interval.as_secs(),
        }
    }
}

/// Run bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Stop the fleet after this many seconds; unset or zero runs until
    /// interrupted or until every member has stalled
    #[serde(default = "default_run_time")]
    pub run_time_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_time_secs: default_run_time(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_fleet_size() -> usize {
    100
}

fn default_networks() -> Vec<String> {
    SUPPORTED_CURRENCIES.iter().map(|c| c.to_string()).collect()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_stall_window() -> u64 {
    120
}

fn default_run_time() -> Option<u64> {
    Some(30 * 60)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `FLEETWATCH_*` environment variables (`FLEETWATCH_FLEET__SIZE=10`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLEETWATCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("fleet.networks")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Reject settings the fleet cannot run with.
    pub fn validate(&self) -> DaemonResult<()> {
        if self.fleet.size == 0 {
            return Err(DaemonError::Config(
                "fleet.size must be at least 1".to_string(),
            ));
        }

        let supported = self
            .fleet
            .networks
            .iter()
            .any(|n| SUPPORTED_CURRENCIES.contains(&n.to_ascii_lowercase().as_str()));
        if !supported {
            return Err(DaemonError::Config(format!(
                "fleet.networks must include one of {:?}",
                SUPPORTED_CURRENCIES
            )));
        }

        self.watchdog_config()?;
        self.fault_profile().validate()?;
        Ok(())
    }

    /// Validated watchdog configuration.
    pub fn watchdog_config(&self) -> DaemonResult<WatchdogConfig> {
        let mut config = WatchdogConfig::new(
            Duration::from_secs(self.watchdog.poll_interval_secs),
            Duration::from_secs(self.watchdog.stall_window_secs),
        );
        if let Some(scheme) = self.fleet.address_scheme {
            config = config.with_address_scheme(scheme);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn fault_profile(&self) -> FaultProfile {
        let f = &self.faults;
        FaultProfile {
            latency_min: Duration::from_secs(f.latency_min_secs),
            latency_max: Duration::from_secs(f.latency_max_secs),
            fail_delay: Duration::from_secs(f.fail_delay_secs),
            fail_period: Duration::from_secs(f.fail_period_secs),
            retry_delay: Duration::from_secs(f.retry_delay_secs),
            sync_interval: Duration::from_secs(f.sync_interval_secs),
        }
    }

    pub fn run_time(&self) -> Option<Duration> {
        self.run
            .run_time_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
