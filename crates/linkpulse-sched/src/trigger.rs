//! Trigger rules — pure fire-or-not predicates over (last-fired, now).

use std::time::Duration;

use time::{OffsetDateTime, Weekday};

/// When a scheduled job should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    /// Fixed cadence: fire once the interval has elapsed since the last
    /// firing (immediately if the job has never fired).
    Every(Duration),
    /// Calendar cadence: fire in the given weekday/hour/minute window,
    /// at most once per window.
    Weekly {
        weekday: Weekday,
        hour: u8,
        minute: u8,
    },
}

impl TriggerRule {
    /// Whether the rule is satisfied at `now`, given the last firing.
    pub fn due(&self, last_fired: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
        match *self {
            Self::Every(interval) => match last_fired {
                None => true,
                Some(last) => (now - last).whole_seconds() >= interval.as_secs() as i64,
            },
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => {
                if now.weekday() != weekday || now.hour() != hour || now.minute() != minute {
                    return false;
                }
                // Already fired in this minute window.
                !last_fired.is_some_and(|last| same_minute(last, now))
            }
        }
    }
}

fn same_minute(a: OffsetDateTime, b: OffsetDateTime) -> bool {
    a.unix_timestamp() / 60 == b.unix_timestamp() / 60
}
