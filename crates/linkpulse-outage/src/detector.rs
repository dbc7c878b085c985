//! Outage detector — consecutive-failure threshold evaluation.

use linkpulse_store::{ResultStore, StoreResult};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;

/// Outcome of one outage evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertDecision {
    /// True when the failure streak has reached the threshold.
    pub should_alert: bool,
    /// Trailing failure count, capped at the evaluation threshold.
    pub consecutive_failures: u32,
}

/// An outage notification for the external alert surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvent {
    pub consecutive_failures: u32,
    pub threshold: u32,
}

/// Sending half of the alert channel.
pub type AlertSink = UnboundedSender<AlertEvent>;

/// Create an alert channel pair.
pub fn alert_channel() -> (AlertSink, UnboundedReceiver<AlertEvent>) {
    unbounded_channel()
}

/// Decides whether the trailing failure streak constitutes an outage.
#[derive(Clone)]
pub struct OutageDetector {
    store: ResultStore,
}

impl OutageDetector {
    /// Create a detector over the given store.
    pub fn new(store: ResultStore) -> Self {
        Self { store }
    }

    /// Evaluate the alert condition against the most recent records.
    pub fn evaluate(&self, threshold: u32) -> StoreResult<AlertDecision> {
        let consecutive_failures = self.store.count_consecutive_failures(threshold)?;
        let should_alert = consecutive_failures >= threshold;
        debug!(
            consecutive_failures,
            threshold, should_alert, "outage condition evaluated"
        );
        Ok(AlertDecision {
            should_alert,
            consecutive_failures,
        })
    }
}
