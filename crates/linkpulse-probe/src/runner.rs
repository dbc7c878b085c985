//! Measurement runner — executes one attempt and captures every failure.

use std::sync::Arc;
use std::time::Duration;

use linkpulse_store::NewRecord;
use tracing::debug;

use crate::probe::{ProbeError, SpeedProbe};
use crate::progress::{ProgressEvent, ProgressSink};

/// Default bound on one full measurement attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one measurement attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementOutcome {
    /// All four steps completed.
    Success {
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: f64,
        server: String,
        country: String,
    },
    /// Some step failed or the attempt timed out.
    Failure { reason: String },
}

impl MeasurementOutcome {
    /// Whether this attempt produced measurements.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The persistable form of this outcome. A failure always maps to
    /// the sentinel row, never a partial record.
    pub fn to_record(&self) -> NewRecord {
        match self {
            Self::Success {
                download_mbps,
                upload_mbps,
                ping_ms,
                server,
                country,
            } => NewRecord::success(
                *download_mbps,
                *upload_mbps,
                Some(*ping_ms),
                server.clone(),
                country.clone(),
            ),
            Self::Failure { .. } => NewRecord::failure(),
        }
    }
}

/// Runs the external measurement capability as one logical unit.
///
/// The probe blocks for tens of seconds, so it executes on a blocking
/// worker bounded by a timeout. A timed-out attempt is abandoned, not
/// cancelled; the worker finishes on its own and its result is dropped.
pub struct Runner {
    probe: Arc<dyn SpeedProbe>,
    progress: ProgressSink,
    timeout: Duration,
}

impl Runner {
    /// Create a runner over the given capability and narration sink.
    pub fn new(probe: Arc<dyn SpeedProbe>, progress: ProgressSink) -> Self {
        Self {
            probe,
            progress,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute one attempt. Never returns an error: every failure mode
    /// is captured as a [`MeasurementOutcome::Failure`].
    pub async fn run(&self) -> MeasurementOutcome {
        let _ = self.progress.send(ProgressEvent::Started);
        debug!("measurement attempt starting");

        let probe = Arc::clone(&self.probe);
        let progress = self.progress.clone();
        let attempt =
            tokio::task::spawn_blocking(move || run_attempt(probe.as_ref(), &progress));

        let outcome = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(Ok(success))) => success,
            Ok(Ok(Err(e))) => MeasurementOutcome::Failure {
                reason: e.to_string(),
            },
            Ok(Err(join_err)) => MeasurementOutcome::Failure {
                reason: format!("measurement task aborted: {join_err}"),
            },
            Err(_) => MeasurementOutcome::Failure {
                reason: format!(
                    "measurement timed out after {}s",
                    self.timeout.as_secs()
                ),
            },
        };

        let reason = match &outcome {
            MeasurementOutcome::Success { .. } => None,
            MeasurementOutcome::Failure { reason } => Some(reason.clone()),
        };
        let _ = self.progress.send(ProgressEvent::Finished {
            success: outcome.is_success(),
            reason,
        });
        outcome
    }
}

/// The blocking four-step sequence. Any step error aborts the whole
/// attempt.
fn run_attempt(
    probe: &dyn SpeedProbe,
    progress: &ProgressSink,
) -> Result<MeasurementOutcome, ProbeError> {
    let server = probe.discover_best_server()?;
    let _ = progress.send(ProgressEvent::ServerSelected {
        name: server.sponsor.clone(),
        country: server.country.clone(),
    });

    let download_mbps = round2(to_mbps(probe.measure_download()?));
    let _ = progress.send(ProgressEvent::DownloadMeasured {
        mbps: download_mbps,
    });

    let upload_mbps = round2(to_mbps(probe.measure_upload()?));
    let _ = progress.send(ProgressEvent::UploadMeasured { mbps: upload_mbps });

    let ping_ms = probe.read_ping()?;
    let _ = progress.send(ProgressEvent::PingMeasured { ms: ping_ms });

    Ok(MeasurementOutcome::Success {
        download_mbps,
        upload_mbps,
        ping_ms,
        server: server.sponsor,
        country: server.country,
    })
}

/// Bytes per second → megabits per second.
fn to_mbps(bytes_per_sec: f64) -> f64 {
    bytes_per_sec * 8.0 / 1_000_000.0
}

/// Round to two decimals, matching the displayed precision.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ServerInfo;
    use crate::progress::progress_channel;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Which step of a scripted probe fails.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FailAt {
        Nowhere,
        Discovery,
        Download,
        Upload,
        Ping,
    }

    struct ScriptedProbe {
        fail_at: FailAt,
        /// Blocking delay inside discovery (for timeout tests).
        delay: Option<Duration>,
    }

    impl ScriptedProbe {
        fn ok() -> Self {
            Self {
                fail_at: FailAt::Nowhere,
                delay: None,
            }
        }

        fn failing_at(fail_at: FailAt) -> Self {
            Self {
                fail_at,
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                fail_at: FailAt::Nowhere,
                delay: Some(delay),
            }
        }
    }

    impl SpeedProbe for ScriptedProbe {
        fn discover_best_server(&self) -> Result<ServerInfo, ProbeError> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.fail_at == FailAt::Discovery {
                return Err(ProbeError::Discovery("no servers reachable".into()));
            }
            Ok(ServerInfo {
                sponsor: "ExampleNet".into(),
                country: "DE".into(),
            })
        }

        fn measure_download(&self) -> Result<f64, ProbeError> {
            if self.fail_at == FailAt::Download {
                return Err(ProbeError::Download("socket closed".into()));
            }
            Ok(11_937_500.0) // 95.5 Mbps
        }

        fn measure_upload(&self) -> Result<f64, ProbeError> {
            if self.fail_at == FailAt::Upload {
                return Err(ProbeError::Upload("socket closed".into()));
            }
            Ok(1_250_000.0) // 10.0 Mbps
        }

        fn read_ping(&self) -> Result<f64, ProbeError> {
            if self.fail_at == FailAt::Ping {
                return Err(ProbeError::Ping("no ping in results".into()));
            }
            Ok(18.5)
        }
    }

    fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn successful_run_converts_and_rounds() {
        let (tx, _rx) = progress_channel();
        let runner = Runner::new(Arc::new(ScriptedProbe::ok()), tx);

        let outcome = runner.run().await;
        assert_eq!(
            outcome,
            MeasurementOutcome::Success {
                download_mbps: 95.5,
                upload_mbps: 10.0,
                ping_ms: 18.5,
                server: "ExampleNet".into(),
                country: "DE".into(),
            }
        );
    }

    #[tokio::test]
    async fn success_emits_full_narration() {
        let (tx, mut rx) = progress_channel();
        let runner = Runner::new(Arc::new(ScriptedProbe::ok()), tx);

        runner.run().await;
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ProgressEvent::Started,
                ProgressEvent::ServerSelected {
                    name: "ExampleNet".into(),
                    country: "DE".into()
                },
                ProgressEvent::DownloadMeasured { mbps: 95.5 },
                ProgressEvent::UploadMeasured { mbps: 10.0 },
                ProgressEvent::PingMeasured { ms: 18.5 },
                ProgressEvent::Finished {
                    success: true,
                    reason: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn failure_at_any_step_collapses_to_failure() {
        for fail_at in [
            FailAt::Discovery,
            FailAt::Download,
            FailAt::Upload,
            FailAt::Ping,
        ] {
            let (tx, _rx) = progress_channel();
            let runner = Runner::new(Arc::new(ScriptedProbe::failing_at(fail_at)), tx);

            let outcome = runner.run().await;
            assert!(
                matches!(outcome, MeasurementOutcome::Failure { .. }),
                "expected failure when failing at {fail_at:?}"
            );
        }
    }

    #[tokio::test]
    async fn failure_record_is_never_partial() {
        // Failing at ping means download/upload were already measured;
        // the record must still be the all-sentinel failure row.
        let (tx, _rx) = progress_channel();
        let runner = Runner::new(Arc::new(ScriptedProbe::failing_at(FailAt::Ping)), tx);

        let record = runner.run().await.to_record();
        assert!(!record.success);
        assert_eq!(record.download_mbps, None);
        assert_eq!(record.upload_mbps, None);
        assert_eq!(record.ping_ms, None);
        assert_eq!(record.server_name, "n/a");
        assert_eq!(record.server_country, "n/a");
    }

    #[tokio::test]
    async fn timeout_yields_failure() {
        let (tx, mut rx) = progress_channel();
        let runner = Runner::new(
            Arc::new(ScriptedProbe::slow(Duration::from_millis(200))),
            tx,
        )
        .with_timeout(Duration::from_millis(20));

        let outcome = runner.run().await;
        let MeasurementOutcome::Failure { reason } = outcome else {
            panic!("expected timeout failure");
        };
        assert!(reason.contains("timed out"));

        // Narration still closes the attempt.
        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Finished { success: false, .. })
        ));
    }

    #[tokio::test]
    async fn success_record_round_trip() {
        let (tx, _rx) = progress_channel();
        let runner = Runner::new(Arc::new(ScriptedProbe::ok()), tx);

        let record = runner.run().await.to_record();
        assert!(record.success);
        assert_eq!(record.download_mbps, Some(95.5));
        assert_eq!(record.upload_mbps, Some(10.0));
        assert_eq!(record.ping_ms, Some(18.5));
        assert_eq!(record.server_name, "ExampleNet");
        assert_eq!(record.server_country, "DE");
    }

    #[test]
    fn mbps_conversion_and_rounding() {
        assert_eq!(round2(to_mbps(1_250_000.0)), 10.0);
        assert_eq!(round2(to_mbps(11_937_500.0)), 95.5);
        assert_eq!(round2(to_mbps(123_456.0)), 0.99);
    }
}
