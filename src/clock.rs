use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Trait for the time source used to stamp entries and price stays
/// Injected so billing can be driven deterministically in tests
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> SystemTime;
}

/// Wall clock backed by `SystemTime::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock: stays frozen until set or advanced
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant
    pub fn new(start: SystemTime) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(later) = now.checked_add(by) {
            *now = later;
        }
    }

    /// Move the clock backward (simulates clock skew), stopping at the Unix epoch
    pub fn rewind(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now
            .checked_sub(by)
            .filter(|earlier| *earlier >= SystemTime::UNIX_EPOCH)
            .unwrap_or(SystemTime::UNIX_EPOCH);
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_and_rewind() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(2_500));
        assert_eq!(clock.now(), start + Duration::from_millis(2_500));

        clock.rewind(Duration::from_secs(10));
        assert_eq!(clock.now(), start - Duration::from_millis(7_500));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_manual_clock_rewind_stops_at_epoch() {
        let clock = ManualClock::new(SystemTime::UNIX_EPOCH + Duration::from_secs(3));

        clock.rewind(Duration::from_secs(10));
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);

        clock.rewind(Duration::MAX);
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
