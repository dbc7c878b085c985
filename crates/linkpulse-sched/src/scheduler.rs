//! Scheduler — cooperative tick loop dispatching due jobs.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::trigger::TriggerRule;

/// Future returned by one job invocation.
pub type JobFuture = std::pin::Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A registered job body. Each call produces one invocation.
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// One registered job.
struct JobSlot {
    name: String,
    rule: TriggerRule,
    last_fired: Option<OffsetDateTime>,
    run: JobFn,
}

/// Polls trigger rules once per tick quantum and dispatches due jobs
/// onto their own tasks. The loop itself never waits on a job.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    tick: Duration,
    jobs: Vec<JobSlot>,
}

impl Scheduler {
    /// Create a scheduler with a one-second tick quantum.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tick: Duration::from_secs(1),
            jobs: Vec::new(),
        }
    }

    /// Override the tick quantum (shorter in tests).
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Register a job. Jobs are checked in registration order.
    pub fn add_job(&mut self, name: impl Into<String>, rule: TriggerRule, run: JobFn) {
        let name = name.into();
        debug!(job = %name, ?rule, "job registered");
        self.jobs.push(JobSlot {
            name,
            rule,
            last_fired: None,
            run,
        });
    }

    /// Dispatch a job immediately, outside its normal cadence — the
    /// startup kick and the manual run-now path. Returns false for an
    /// unknown name.
    pub fn kick(&mut self, name: &str) -> bool {
        match self.jobs.iter().position(|job| job.name == name) {
            Some(idx) => {
                self.fire(idx);
                true
            }
            None => {
                warn!(job = %name, "kick requested for unknown job");
                false
            }
        }
    }

    /// Check every rule against the clock and fire what is due.
    fn poll(&mut self) {
        let now = self.clock.now();
        for idx in 0..self.jobs.len() {
            if self.jobs[idx].rule.due(self.jobs[idx].last_fired, now) {
                self.fire(idx);
            }
        }
    }

    /// Spawn one invocation of the job at `idx`. A failed invocation is
    /// logged and isolated; it cannot block or crash subsequent ticks.
    fn fire(&mut self, idx: usize) {
        let slot = &mut self.jobs[idx];
        slot.last_fired = Some(self.clock.now());
        let name = slot.name.clone();
        let invocation = (slot.run)();
        debug!(job = %name, "job dispatched");
        tokio::spawn(async move {
            if let Err(e) = invocation.await {
                error!(job = %name, error = %e, "job failed");
            }
        });
    }

    /// Run the tick loop until the shutdown signal flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            jobs = self.jobs.len(),
            tick_ms = self.tick.as_millis() as u64,
            "scheduler started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => self.poll(),
                _ = shutdown.changed() => {
                    info!("scheduler shutting down");
                    break;
                }
            }
        }
    }
}
