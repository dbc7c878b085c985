//! linkpulsed — the LinkPulse daemon.
//!
//! Single binary that assembles the measurement pipeline:
//! - Result store (SQLite)
//! - Measurement runner over an external speed test tool
//! - Outage detector
//! - Scheduler: measurement every N hours, weekly trend report,
//!   weekly retention cleanup
//!
//! # Usage
//!
//! ```text
//! linkpulsed --db-path /var/lib/linkpulse/linkpulse.db --schedule-hours 3
//! ```

mod config;
mod external;
mod jobs;
mod sinks;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use time::Weekday;
use tokio::sync::watch;
use tracing::{info, warn};

use linkpulse_outage::{OutageDetector, alert_channel};
use linkpulse_probe::{Runner, progress_channel};
use linkpulse_sched::{Scheduler, SingleFlight, SystemClock, TriggerRule};
use linkpulse_store::ResultStore;

use config::Config;
use external::ExternalToolProbe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,linkpulsed=debug,linkpulse=debug".parse().unwrap()),
        )
        .init();

    let config = Config::parse();
    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!("LinkPulse daemon starting");

    if let Some(dir) = config.db_path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }

    // ── Initialize subsystems ──────────────────────────────────

    let store = ResultStore::open(&config.db_path)?;
    store.initialize()?;
    info!(path = ?config.db_path, "result store ready");

    // Presentation task: the sole consumer of narration and alerts.
    let (progress_tx, progress_rx) = progress_channel();
    let (alert_tx, alert_rx) = alert_channel();
    let presenter = sinks::spawn_presenter(progress_rx, alert_rx);

    let probe = Arc::new(ExternalToolProbe::new(config.speedtest_cmd.clone()));
    let runner = Arc::new(
        Runner::new(probe, progress_tx).with_timeout(config.measure_timeout()),
    );
    let detector = OutageDetector::new(store.clone());
    info!(command = %config.speedtest_cmd, "measurement runner ready");

    // ── Register jobs ──────────────────────────────────────────

    let mut scheduler = Scheduler::new(Arc::new(SystemClock));
    scheduler.add_job(
        "measure",
        TriggerRule::Every(config.schedule_interval()),
        jobs::measurement_job(
            runner,
            store.clone(),
            detector,
            alert_tx,
            config.outage_threshold,
            config.retention(),
            SingleFlight::new(),
        ),
    );
    scheduler.add_job(
        "weekly-report",
        TriggerRule::Weekly {
            weekday: Weekday::Monday,
            hour: 8,
            minute: 0,
        },
        jobs::report_job(store.clone()),
    );
    scheduler.add_job(
        "cleanup",
        TriggerRule::Weekly {
            weekday: Weekday::Sunday,
            hour: 3,
            minute: 0,
        },
        jobs::cleanup_job(store, config.retention()),
    );
    info!(
        interval_hours = config.schedule_hours,
        outage_threshold = config.outage_threshold,
        retention_days = config.retention_days,
        "jobs registered"
    );

    // One measurement right away, outside the normal cadence.
    scheduler.kick("measure");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;

    // Dropping the scheduler releases the last senders; the presenter
    // drains whatever is queued and exits. An abandoned measurement
    // worker can hold a sender open past its timeout, so the wait is
    // bounded.
    if tokio::time::timeout(Duration::from_secs(5), presenter)
        .await
        .is_err()
    {
        warn!("presenter still draining at shutdown; exiting");
    }

    info!("LinkPulse daemon stopped");
    Ok(())
}
