//! Time abstraction for testability
//!
//! Circuit breakers and the error reporter read time through [`Clock`] so
//! that production code uses the real system clock while tests advance a
//! [`MockClock`] deterministically, without sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of monotonic and wall-clock time
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Current wall-clock time as a UTC timestamp
    fn utc_now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.system_time())
    }

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        let millis =
            self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed counter, so a test can hand one clone to a
/// circuit breaker and advance time through another.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    wall_start: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock anchored at the current instant and wall time
    pub fn new() -> Self {
        Self::with_wall_time(SystemTime::now())
    }

    /// Create a mock clock whose wall time starts at `wall_start`
    pub fn with_wall_time(wall_start: SystemTime) -> Self {
        Self { start: Instant::now(), wall_start, elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.wall_start + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let now1 = clock.now();
        let now2 = clock.now();
        assert!(now2 >= now1, "System clock should advance");
    }

    #[test]
    fn test_mock_clock_advance_moves_both_clocks() {
        let clock = MockClock::with_wall_time(UNIX_EPOCH);
        let start = clock.now();

        clock.advance(Duration::from_secs(5));
        clock.advance_millis(250);

        assert_eq!(clock.now().duration_since(start), Duration::from_millis(5250));
        assert_eq!(clock.millis_since_epoch(), 5250);
        assert_eq!(clock.utc_now().timestamp_millis(), 5250);
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let clock1 = MockClock::new();
        let clock2 = clock1.clone();

        clock2.advance(Duration::from_secs(10));
        assert_eq!(clock1.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = Arc::new(MockClock::with_wall_time(UNIX_EPOCH));
        clock.advance(Duration::from_secs(1));
        assert_eq!(Clock::millis_since_epoch(&clock), 1000);
    }
}
