//! Injectable clock.
//!
//! Every time-dependent operation derives elapsed/remaining time from stored
//! timestamps and a supplied "now" rather than a live timer, so the clock is a
//! trait the caller injects. Tests pin it with [`ManualClock`].

use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an explicit instant, advanced by hand.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex") = now;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock mutex");
        *guard += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 1, 30).unwrap()
        );
    }
}
