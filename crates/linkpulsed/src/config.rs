//! Daemon configuration — CLI flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// LinkPulse daemon configuration.
#[derive(Debug, Parser)]
#[command(name = "linkpulsed", about = "LinkPulse network measurement daemon")]
pub struct Config {
    /// Path to the SQLite result database.
    #[arg(long, default_value = "linkpulse.db", env = "LINKPULSE_DB_PATH")]
    pub db_path: PathBuf,

    /// Retention window in days; older records are pruned.
    #[arg(long, default_value_t = 90, env = "LINKPULSE_RETENTION_DAYS")]
    pub retention_days: u32,

    /// Consecutive failed measurements before an outage alert.
    #[arg(long, default_value_t = 4, env = "LINKPULSE_OUTAGE_THRESHOLD")]
    pub outage_threshold: u32,

    /// Hours between scheduled measurements.
    #[arg(long, default_value_t = 3, env = "LINKPULSE_SCHEDULE_HOURS")]
    pub schedule_hours: u32,

    /// Bound on one full measurement attempt, in seconds.
    #[arg(long, default_value_t = 120, env = "LINKPULSE_MEASURE_TIMEOUT_SECS")]
    pub measure_timeout_secs: u64,

    /// External speed test command; must support `--json` output.
    #[arg(long, default_value = "speedtest-cli", env = "LINKPULSE_SPEEDTEST_CMD")]
    pub speedtest_cmd: String,
}

impl Config {
    /// The retention window as a duration.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * 86_400)
    }

    /// The scheduled measurement cadence.
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.schedule_hours) * 3_600)
    }

    /// The measurement attempt timeout.
    pub fn measure_timeout(&self) -> Duration {
        Duration::from_secs(self.measure_timeout_secs)
    }
}
