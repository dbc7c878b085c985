//! Presentation task — the single consumer of progress and alert events.
//!
//! Workers never produce user-facing output directly; everything is
//! marshalled through channels onto this one task.

use linkpulse_outage::AlertEvent;
use linkpulse_probe::ProgressEvent;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Spawn the presenter. Each channel is drained to closure on its own;
/// the task exits only once both have closed.
pub fn spawn_presenter(
    mut progress: UnboundedReceiver<ProgressEvent>,
    mut alerts: UnboundedReceiver<AlertEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = progress.recv() => narrate(&event),
                Some(alert) = alerts.recv() => warn!(
                    consecutive_failures = alert.consecutive_failures,
                    threshold = alert.threshold,
                    "OUTAGE: measurement has failed repeatedly"
                ),
                else => break,
            }
        }
    })
}

fn narrate(event: &ProgressEvent) {
    match event {
        ProgressEvent::Started => info!("starting speed test"),
        ProgressEvent::ServerSelected { name, country } => {
            info!(server = %name, country = %country, "measurement server selected");
        }
        ProgressEvent::DownloadMeasured { mbps } => info!(mbps = *mbps, "download speed"),
        ProgressEvent::UploadMeasured { mbps } => info!(mbps = *mbps, "upload speed"),
        ProgressEvent::PingMeasured { ms } => info!(ms = *ms, "ping"),
        ProgressEvent::Finished { success: true, .. } => info!("speed test complete"),
        ProgressEvent::Finished {
            success: false,
            reason,
        } => warn!(reason = reason.as_deref().unwrap_or("unknown"), "speed test failed"),
    }
}
