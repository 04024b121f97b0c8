use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to, optionally stepping forward by a
/// fixed amount every time it is read.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug)]
struct ManualClockState {
    now: DateTime<Utc>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualClockState {
                now: start,
                step: Duration::zero(),
            })),
        }
    }

    pub fn with_step(self, step: Duration) -> Self {
        self.state().step = step;
        self
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.state().now = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state();
        state.now += by;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ManualClockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state();
        let now = state.now;
        state.now = now + state.step;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_steps_after_each_read() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start).with_step(Duration::minutes(1));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::minutes(1));

        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), start + Duration::minutes(12));
    }

    #[test]
    fn test_manual_clock_set() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let later = start + Duration::hours(3);
        clock.set(later);
        assert_eq!(clock.now(), later);
        assert_eq!(clock.now(), later);
    }
}
