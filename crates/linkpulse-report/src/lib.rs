//! linkpulse-report — historical trend aggregation for LinkPulse.
//!
//! Pure functions that group measurement records by ISO week or calendar
//! month and average download/upload throughput over successful attempts
//! only. Rendering (charts, PDF export) is an external consumer of these
//! aggregates.

pub mod aggregate;

pub use aggregate::{PeriodAverage, monthly_averages, weekly_averages};
