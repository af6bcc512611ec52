//! Time source abstraction for deterministic testing.
//!
//! Review creation timestamps come from a `TimeSource`, so production uses the
//! system clock and tests can pin the clock to a known instant.

use chrono::{DateTime, SubsecRound, Utc};

/// Abstraction over the wall clock.
pub trait TimeSource: Send + Sync {
    /// The current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time source using the system clock, truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source() {
        let source = SystemTimeSource;
        let t1 = source.now();
        let t2 = source.now();

        // Time should be reasonable (after 2020)
        assert!(t1.timestamp() > 1_577_836_800); // 2020-01-01 00:00:00 UTC

        // Time should not go backwards
        assert!(t2 >= t1);

        // Whole seconds only
        assert_eq!(t1.timestamp_subsec_nanos(), 0);
    }
}
