//! Single-flight guard for jobs that must not overlap themselves.
//!
//! Two simultaneous bandwidth tests skew each other's readings, so the
//! measurement job takes a permit before running and skips the trigger
//! when one is already held.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared overlap guard. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit, or `None` if a flight is already in progress.
    pub fn try_begin(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then(|| FlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Whether a permit is currently held.
    pub fn in_flight(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Held for the duration of one flight; releases on drop.
#[derive(Debug)]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
