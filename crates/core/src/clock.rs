use std::sync::Mutex;

use chrono::{DateTime, Duration, DurationRound, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to microseconds that never repeats or goes backwards.
///
/// Persisted timestamps keep microsecond precision, so two writes inside the
/// same microsecond would otherwise become indistinguishable.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    fn next_after(last: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
        let candidate = truncate_to_micros(candidate);
        match last {
            Some(last) if candidate <= last => last + Duration::microseconds(1),
            _ => candidate,
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = Self::next_after(*last, Utc::now());
        *last = Some(next);
        next
    }
}

/// Fixed instant that advances one microsecond per call. Test helper.
#[derive(Debug)]
pub struct SteppingClock {
    current: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { current: Mutex::new(truncate_to_micros(start)) }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = *current;
        *current = now + Duration::microseconds(1);
        now
    }
}

pub fn truncate_to_micros(value: DateTime<Utc>) -> DateTime<Utc> {
    value.duration_trunc(Duration::microseconds(1)).unwrap_or(value)
}
