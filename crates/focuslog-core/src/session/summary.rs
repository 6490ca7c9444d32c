//! Summary aggregation over completed focus sessions.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::types::Session;

/// Period to group completed focus sessions by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryGroupBy {
    Day,
    Week,
    Month,
}

/// One aggregated period. Periods with no completed focus sessions are not
/// emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub period_start: NaiveDate,
    pub focus_sessions: u32,
    pub focus_seconds: u64,
}

/// Grouping key for a completion date: the date itself, the Monday of its ISO
/// week, or the first day of its month.
fn period_start(date: NaiveDate, group_by: SummaryGroupBy) -> NaiveDate {
    match group_by {
        SummaryGroupBy::Day => date,
        SummaryGroupBy::Week => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
        SummaryGroupBy::Month => date.with_day(1).unwrap_or(date),
    }
}

/// Aggregate completed focus sessions into per-period counts and totals,
/// newest period first. Sessions that are not completed, not focus, or lack
/// `ended_at` are ignored.
pub fn summarize(sessions: &[Session], group_by: SummaryGroupBy) -> Vec<SummaryRow> {
    let mut buckets: BTreeMap<NaiveDate, (u32, u64)> = BTreeMap::new();

    for session in sessions {
        if !matches!(session.status, super::types::SessionStatus::Completed)
            || !session.session_type.is_focus()
        {
            continue;
        }
        let Some(ended_at) = session.ended_at else {
            continue;
        };
        let key = period_start(ended_at.date_naive(), group_by);
        let entry = buckets.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += session.actual_seconds as u64;
    }

    buckets
        .into_iter()
        .rev()
        .map(|(period_start, (focus_sessions, focus_seconds))| SummaryRow {
            period_start,
            focus_sessions,
            focus_seconds,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::OwnerId;
    use crate::session::types::{SessionStatus, SessionType};
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn completed_focus(ended_at: DateTime<Utc>, actual_seconds: u32) -> Session {
        Session {
            id: Uuid::new_v4(),
            owner: OwnerId::generate(),
            title: String::new(),
            session_type: SessionType::Focus,
            planned_seconds: 1500,
            actual_seconds,
            started_at: ended_at - chrono::Duration::seconds(actual_seconds as i64),
            ended_at: Some(ended_at),
            status: SessionStatus::Completed,
            cycle_index: 1,
            created_at: ended_at,
            planned_end_at: None,
            last_notified_step: -1,
            tags: Vec::new(),
        }
    }

    #[test]
    fn week_grouping_splits_on_monday() {
        // Sun 2026-03-01, Mon 2026-03-02, Tue 2026-03-03.
        let sessions = vec![
            completed_focus(Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(), 1500),
            completed_focus(Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(), 1500),
            completed_focus(Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap(), 1200),
        ];

        let rows = summarize(&sessions, SummaryGroupBy::Week);
        assert_eq!(rows.len(), 2);
        // Newest period first: the week starting Mon 2026-03-02.
        assert_eq!(
            rows[0],
            SummaryRow {
                period_start: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                focus_sessions: 2,
                focus_seconds: 2700,
            }
        );
        // The Sunday falls in the week starting Mon 2026-02-23.
        assert_eq!(
            rows[1].period_start,
            NaiveDate::from_ymd_opt(2026, 2, 23).unwrap()
        );
        assert_eq!(rows[1].focus_sessions, 1);
        assert_eq!(rows[1].focus_seconds, 1500);
    }

    #[test]
    fn month_grouping_uses_first_of_month() {
        let sessions = vec![
            completed_focus(Utc.with_ymd_and_hms(2026, 2, 27, 8, 0, 0).unwrap(), 600),
            completed_focus(Utc.with_ymd_and_hms(2026, 3, 15, 8, 0, 0).unwrap(), 900),
        ];
        let rows = summarize(&sessions, SummaryGroupBy::Month);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].period_start,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert_eq!(
            rows[1].period_start,
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
    }

    #[test]
    fn ignores_breaks_cancelled_and_unfinished() {
        let ended = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let mut short_break = completed_focus(ended, 300);
        short_break.session_type = SessionType::ShortBreak;
        let mut cancelled = completed_focus(ended, 300);
        cancelled.status = SessionStatus::Cancelled;
        let mut unfinished = completed_focus(ended, 300);
        unfinished.ended_at = None;

        let rows = summarize(&[short_break, cancelled, unfinished], SummaryGroupBy::Day);
        assert!(rows.is_empty());
    }

    #[test]
    fn day_grouping_counts_per_date() {
        let sessions = vec![
            completed_focus(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(), 1500),
            completed_focus(Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(), 1500),
        ];
        let rows = summarize(&sessions, SummaryGroupBy::Day);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].focus_sessions, 2);
        assert_eq!(rows[0].focus_seconds, 3000);
    }
}
