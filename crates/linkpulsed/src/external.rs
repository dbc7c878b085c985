//! `SpeedProbe` implementation over an external speed test CLI.
//!
//! The tool performs the full test in a single `--json` invocation, so
//! server discovery runs it and captures the parsed report; the
//! remaining capability steps read from that capture. Reading before
//! discovery is an error.

use std::process::Command;
use std::sync::Mutex;

use linkpulse_probe::{ProbeError, ServerInfo, SpeedProbe};
use serde::Deserialize;
use tracing::debug;

/// Parsed `--json` output of the speed test tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolReport {
    /// Download throughput in bits per second.
    pub download: f64,
    /// Upload throughput in bits per second.
    pub upload: f64,
    /// Latency in milliseconds; some tool versions omit it.
    pub ping: Option<f64>,
    pub server: ToolServer,
}

/// Server block of the tool report.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolServer {
    pub sponsor: String,
    pub country: String,
}

/// Probe backed by an external command such as `speedtest-cli`.
pub struct ExternalToolProbe {
    command: String,
    report: Mutex<Option<ToolReport>>,
}

impl ExternalToolProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            report: Mutex::new(None),
        }
    }

    fn cached<T>(
        &self,
        read: impl FnOnce(&ToolReport) -> Result<T, ProbeError>,
    ) -> Result<T, ProbeError> {
        let guard = self
            .report
            .lock()
            .map_err(|_| ProbeError::Tool("probe state poisoned".into()))?;
        match guard.as_ref() {
            Some(report) => read(report),
            None => Err(ProbeError::Tool("server discovery has not run".into())),
        }
    }
}

fn parse_report(bytes: &[u8]) -> Result<ToolReport, ProbeError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ProbeError::Tool(format!("unparseable tool report: {e}")))
}

impl SpeedProbe for ExternalToolProbe {
    fn discover_best_server(&self) -> Result<ServerInfo, ProbeError> {
        let output = Command::new(&self.command)
            .arg("--json")
            .output()
            .map_err(|e| ProbeError::Tool(format!("failed to launch {}: {e}", self.command)))?;
        if !output.status.success() {
            return Err(ProbeError::Tool(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        let report = parse_report(&output.stdout)?;
        let info = ServerInfo {
            sponsor: report.server.sponsor.clone(),
            country: report.server.country.clone(),
        };
        debug!(server = %info.sponsor, country = %info.country, "speed test report captured");

        *self
            .report
            .lock()
            .map_err(|_| ProbeError::Tool("probe state poisoned".into()))? = Some(report);
        Ok(info)
    }

    fn measure_download(&self) -> Result<f64, ProbeError> {
        // The tool reports bits/sec; the capability contract is bytes/sec.
        self.cached(|report| Ok(report.download / 8.0))
    }

    fn measure_upload(&self) -> Result<f64, ProbeError> {
        self.cached(|report| Ok(report.upload / 8.0))
    }

    fn read_ping(&self) -> Result<f64, ProbeError> {
        self.cached(|report| {
            report
                .ping
                .ok_or_else(|| ProbeError::Ping("tool reported no ping".into()))
        })
    }
}
