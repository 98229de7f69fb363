//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, Local};

/// Display format used for every `datetime` field on the wire.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current server-local time
    fn now(&self) -> DateTime<Local>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Local>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    pub fn new(fixed_time: DateTime<Local>) -> Self {
        Self { fixed_time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.fixed_time
    }
}

/// Format a local time as `YYYY-MM-DD HH:MM:SS`
pub fn format_datetime(datetime: &DateTime<Local>) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

/// Current time of `clock`, formatted for the wire
pub fn current_datetime(clock: &dyn Clock) -> String {
    format_datetime(&clock.now())
}
