//! Wall-clock source for record timestamps
//!
//! Phase durations use `std::time::Instant`; only the millisecond timestamps
//! stored on records and verdicts go through a `Clock` so tests can pin them.

use std::cell::Cell;
use std::rc::Rc;

/// Source of millisecond timestamps
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// Clock backed by `chrono::Utc`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    /// Create a clock starting at `start_ms`
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }

    /// Jump to an absolute time
    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 1_250);
        other.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
