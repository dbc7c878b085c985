//! The scheduled job bodies: measurement, weekly report, retention
//! cleanup. Each returns a [`JobFn`] for the scheduler; errors bubble to
//! the scheduler, which logs them and keeps ticking.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use linkpulse_outage::{AlertEvent, AlertSink, OutageDetector};
use linkpulse_probe::Runner;
use linkpulse_report::{monthly_averages, weekly_averages};
use linkpulse_sched::{JobFn, SingleFlight};
use linkpulse_store::ResultStore;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// One measurement attempt: run, persist, evaluate the outage condition
/// on failure, prune on success. Overlapping triggers are skipped.
pub fn measurement_job(
    runner: Arc<Runner>,
    store: ResultStore,
    detector: OutageDetector,
    alerts: AlertSink,
    threshold: u32,
    retention: Duration,
    flight: SingleFlight,
) -> JobFn {
    Arc::new(move || {
        let runner = Arc::clone(&runner);
        let store = store.clone();
        let detector = detector.clone();
        let alerts = alerts.clone();
        let flight = flight.clone();
        Box::pin(async move {
            let Some(_permit) = flight.try_begin() else {
                warn!("a measurement is already in flight; skipping this trigger");
                return Ok(());
            };

            let outcome = runner.run().await;
            let record = outcome.to_record();
            let succeeded = record.success;
            let id = store
                .append(&record)
                .context("failed to persist measurement")?;
            debug!(id, success = succeeded, "measurement recorded");

            if succeeded {
                let pruned = store.prune_older_than(retention)?;
                if pruned > 0 {
                    info!(pruned, "stale records pruned after successful run");
                }
            } else {
                let decision = detector.evaluate(threshold)?;
                if decision.should_alert {
                    let _ = alerts.send(AlertEvent {
                        consecutive_failures: decision.consecutive_failures,
                        threshold,
                    });
                }
            }
            Ok(())
        })
    })
}

/// Weekly trend report: aggregate and emit period averages.
pub fn report_job(store: ResultStore) -> JobFn {
    Arc::new(move || {
        let store = store.clone();
        Box::pin(async move {
            let records = store.query_all()?;
            let weekly = weekly_averages(&records);
            let monthly = monthly_averages(&records);
            info!(
                records = records.len(),
                weeks = weekly.len(),
                months = monthly.len(),
                "trend report"
            );
            for row in weekly.iter().chain(monthly.iter()) {
                info!(
                    period = %row.period,
                    download_mbps = row.avg_download_mbps,
                    upload_mbps = row.avg_upload_mbps,
                    "period average"
                );
            }
            store.meta_set(
                "last_report_at",
                &OffsetDateTime::now_utc().unix_timestamp().to_string(),
            )?;
            Ok(())
        })
    })
}

/// Weekly retention cleanup.
pub fn cleanup_job(store: ResultStore, retention: Duration) -> JobFn {
    Arc::new(move || {
        let store = store.clone();
        Box::pin(async move {
            let pruned = store.prune_older_than(retention)?;
            info!(
                pruned,
                retention_days = retention.as_secs() / 86_400,
                "retention cleanup complete"
            );
            Ok(())
        })
    })
}
