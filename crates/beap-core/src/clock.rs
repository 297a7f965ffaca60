//! Time abstraction for testability
//!
//! The builder stamps headers and filenames with the current time. Tests
//! inject a [`FixedClock`] so that timestamps and filenames are reproducible.

use chrono::{DateTime, TimeZone, Utc};

/// Time source used by the builder
pub trait Clock: Send + Sync {
    /// Get the current UTC datetime
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current time as Unix milliseconds
    fn now_millis(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }
}

/// Real clock implementation using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    /// Freeze the clock at the given instant
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Freeze the clock at the given Unix milliseconds
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        let instant = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_default();
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_stable() {
        let clock = FixedClock::from_millis(1_700_000_000_000);
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
        assert_eq!(clock.now_utc(), clock.now_utc());
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now_millis();
        let b = clock.now_millis();
        assert!(b >= a);
    }
}
