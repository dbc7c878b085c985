//! Progress narration events emitted by the runner.
//!
//! The runner produces log content, never log presentation: events are
//! sent through a channel and consumed by whatever context owns the
//! user-facing output. Workers never write to that context directly.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Human-readable narration of one measurement attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The attempt started.
    Started,
    /// A measurement server was selected.
    ServerSelected { name: String, country: String },
    /// Download throughput measured, in Mbps.
    DownloadMeasured { mbps: f64 },
    /// Upload throughput measured, in Mbps.
    UploadMeasured { mbps: f64 },
    /// Latency read, in milliseconds.
    PingMeasured { ms: f64 },
    /// The attempt finished, successfully or not.
    Finished { success: bool, reason: Option<String> },
}

/// Sending half of the narration channel, injected into the runner.
pub type ProgressSink = UnboundedSender<ProgressEvent>;

/// Create a narration channel pair.
pub fn progress_channel() -> (ProgressSink, UnboundedReceiver<ProgressEvent>) {
    unbounded_channel()
}
