//! linkpulse-sched — job scheduling for LinkPulse.
//!
//! A single cooperative tick loop polls every registered job's trigger
//! rule against the injected clock and dispatches due jobs onto their
//! own tasks, so a measurement that blocks for a minute never stalls
//! the loop. Trigger rules are pure functions of
//! `(last_fired, now)`, which makes them testable without wall-clock
//! waits.
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── Clock (SystemClock in production, ManualClock in tests)
//!   ├── Ordered jobs: {name, TriggerRule, last_fired, JobFn}
//!   ├── Tick loop: select! { sleep(tick) => poll, shutdown => break }
//!   └── tokio::spawn per fired job (errors logged, never propagated)
//! ```
//!
//! `SingleFlight` is the overlap guard for jobs that must not run
//! concurrently with themselves, such as bandwidth measurements.

pub mod clock;
pub mod flight;
pub mod scheduler;
pub mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use flight::{FlightPermit, SingleFlight};
pub use scheduler::{JobFn, JobFuture, Scheduler};
pub use trigger::TriggerRule;
