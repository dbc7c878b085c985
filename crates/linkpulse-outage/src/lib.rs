//! linkpulse-outage — outage detection for LinkPulse.
//!
//! Derives a boolean alert condition from the tail of the result store:
//! `threshold` or more consecutive failed attempts means the link is
//! considered down. The detector only decides; delivery happens through
//! an [`AlertSink`] channel consumed by whatever owns presentation.
//!
//! Evaluation is only worthwhile right after a failure is persisted — a
//! success resets the streak to zero and can never trigger an alert.

pub mod detector;

pub use detector::{AlertDecision, AlertEvent, AlertSink, OutageDetector, alert_channel};
