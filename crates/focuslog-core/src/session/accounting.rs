//! Time accounting for sessions.
//!
//! Elapsed and remaining time are derived from persisted fields and a supplied
//! "now" -- there is no live timer. While a session runs, its committed
//! `actual_seconds` plus the wall-clock span since `started_at` is the truth;
//! in any other status the committed total alone is.
//!
//! `elapsed_seconds` is deliberately not clamped to `planned_seconds` here:
//! the state machine caps it when committing, and the notification scheduler
//! needs the uncapped overrun.

use chrono::{DateTime, Duration, Utc};

use super::types::{Session, SessionStatus};

/// Committed seconds plus the currently-running interval, whole seconds,
/// never negative.
pub fn elapsed_seconds(session: &Session, now: DateTime<Utc>) -> u32 {
    let base = session.actual_seconds;
    if session.status != SessionStatus::Running {
        return base;
    }
    let running = (now - session.started_at)
        .num_seconds()
        .clamp(0, u32::MAX as i64) as u32;
    base.saturating_add(running)
}

/// Seconds until the planned duration is reached; zero once overrun.
pub fn remaining_seconds(session: &Session, now: DateTime<Utc>) -> u32 {
    session
        .planned_seconds
        .saturating_sub(elapsed_seconds(session, now))
}

/// Due time of a running interval that begins at `started_at` with
/// `remaining` seconds left. Recomputed on every start and resume, from the
/// remaining time at that moment rather than the full planned duration.
pub fn planned_end_at(started_at: DateTime<Utc>, remaining: u32) -> DateTime<Utc> {
    started_at + Duration::seconds(remaining as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::OwnerId;
    use crate::session::types::SessionType;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn session(status: SessionStatus, actual: u32) -> Session {
        Session {
            id: Uuid::new_v4(),
            owner: OwnerId::generate(),
            title: String::new(),
            session_type: SessionType::Focus,
            planned_seconds: 1500,
            actual_seconds: actual,
            started_at: base_time(),
            ended_at: None,
            status,
            cycle_index: 1,
            created_at: base_time(),
            planned_end_at: None,
            last_notified_step: -1,
            tags: Vec::new(),
        }
    }

    #[test]
    fn running_session_accrues_wall_clock_time() {
        let s = session(SessionStatus::Running, 100);
        let now = base_time() + Duration::seconds(42);
        assert_eq!(elapsed_seconds(&s, now), 142);
    }

    #[test]
    fn paused_session_holds_committed_total() {
        let s = session(SessionStatus::Paused, 300);
        let now = base_time() + Duration::seconds(9999);
        assert_eq!(elapsed_seconds(&s, now), 300);
    }

    #[test]
    fn clock_before_started_at_does_not_go_negative() {
        let s = session(SessionStatus::Running, 50);
        let now = base_time() - Duration::seconds(30);
        assert_eq!(elapsed_seconds(&s, now), 50);
    }

    #[test]
    fn elapsed_exceeds_planned_when_overrun() {
        let s = session(SessionStatus::Running, 0);
        let now = base_time() + Duration::seconds(2000);
        assert_eq!(elapsed_seconds(&s, now), 2000);
        assert_eq!(remaining_seconds(&s, now), 0);
    }

    #[test]
    fn planned_end_uses_remaining_not_full_duration() {
        let resumed_at = base_time();
        assert_eq!(
            planned_end_at(resumed_at, 600),
            resumed_at + Duration::seconds(600)
        );
    }

    proptest! {
        // Elapsed time never decreases as the clock advances, and is constant
        // while not running.
        #[test]
        fn elapsed_monotone_while_running(actual in 0u32..4000, a in 0i64..100_000, b in 0i64..100_000) {
            let s = session(SessionStatus::Running, actual);
            let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
            let at_earlier = elapsed_seconds(&s, base_time() + Duration::seconds(earlier));
            let at_later = elapsed_seconds(&s, base_time() + Duration::seconds(later));
            prop_assert!(at_earlier <= at_later);
        }

        #[test]
        fn elapsed_constant_while_paused(actual in 0u32..4000, offset in -100_000i64..100_000) {
            let s = session(SessionStatus::Paused, actual);
            let now = base_time() + Duration::seconds(offset);
            prop_assert_eq!(elapsed_seconds(&s, now), actual);
        }

        // Remaining time stays within [0, planned_seconds].
        #[test]
        fn remaining_bounded(actual in 0u32..4000, offset in -100_000i64..100_000) {
            let s = session(SessionStatus::Running, actual);
            let now = base_time() + Duration::seconds(offset);
            let remaining = remaining_seconds(&s, now);
            prop_assert!(remaining <= s.planned_seconds);
        }
    }
}
