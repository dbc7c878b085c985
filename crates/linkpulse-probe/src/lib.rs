//! linkpulse-probe — measurement runner for LinkPulse.
//!
//! Wraps the external speed measurement capability behind the
//! [`SpeedProbe`] trait and runs it as one logical unit with a timeout.
//! Any step failure collapses into a [`MeasurementOutcome::Failure`];
//! nothing escapes the runner's boundary as an error, so the scheduler
//! stays responsive no matter what the measurement does.
//!
//! # Architecture
//!
//! ```text
//! Runner
//!   ├── SpeedProbe (blocking; runs on spawn_blocking)
//!   │   ├── discover_best_server()
//!   │   ├── measure_download() / measure_upload()
//!   │   └── read_ping()
//!   ├── tokio::time::timeout bounding the whole attempt
//!   └── ProgressSink (narration events, consumed elsewhere)
//! ```

pub mod probe;
pub mod progress;
pub mod runner;

pub use probe::{ProbeError, ServerInfo, SpeedProbe};
pub use progress::{ProgressEvent, ProgressSink, progress_channel};
pub use runner::{MeasurementOutcome, Runner};
