//! The consumed measurement capability.

use thiserror::Error;

/// Errors raised by a [`SpeedProbe`] implementation.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("server discovery failed: {0}")]
    Discovery(String),

    #[error("download measurement failed: {0}")]
    Download(String),

    #[error("upload measurement failed: {0}")]
    Upload(String),

    #[error("ping read failed: {0}")]
    Ping(String),

    #[error("measurement tool error: {0}")]
    Tool(String),
}

/// The measurement server chosen by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Sponsor name of the server.
    pub sponsor: String,
    /// Country the server is located in.
    pub country: String,
}

/// External speed measurement capability.
///
/// All methods block, potentially for tens of seconds; the runner always
/// calls them off the async executor. The expected call sequence is
/// discovery → download → upload → ping, as one logical unit.
pub trait SpeedProbe: Send + Sync {
    /// Pick the best measurement server.
    fn discover_best_server(&self) -> Result<ServerInfo, ProbeError>;

    /// Measure download throughput in bytes per second.
    fn measure_download(&self) -> Result<f64, ProbeError>;

    /// Measure upload throughput in bytes per second.
    fn measure_upload(&self) -> Result<f64, ProbeError>;

    /// Read the measured latency in milliseconds.
    fn read_ping(&self) -> Result<f64, ProbeError>;
}
