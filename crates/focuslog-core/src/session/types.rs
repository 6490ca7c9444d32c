//! Session records and operation inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::owner::OwnerId;

/// Upper bound for an explicitly supplied planned duration (24 hours).
pub const MAX_PLANNED_SECONDS: i64 = 24 * 60 * 60;
pub const MAX_CYCLE_INDEX: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_focus(self) -> bool {
        matches!(self, SessionType::Focus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Running or paused; at most one such session exists per owner.
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }
}

/// Persisted session record.
///
/// `actual_seconds` holds committed elapsed time only -- the currently-running
/// interval is derived from `started_at` at read time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub owner: OwnerId,
    pub title: String,
    pub session_type: SessionType,
    pub planned_seconds: u32,
    pub actual_seconds: u32,
    /// Start of the current running interval; reset on each resume.
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub cycle_index: u32,
    pub created_at: DateTime<Utc>,
    /// Due time of the session while running; cleared on pause and close.
    pub planned_end_at: Option<DateTime<Utc>>,
    /// Highest overrun step already notified; -1 when none sent yet.
    pub last_notified_step: i64,
    pub tags: Vec<String>,
}

/// Input for starting a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSession {
    #[serde(default)]
    pub title: String,
    pub session_type: SessionType,
    /// Planned duration override; defaults to the owner's settings per type.
    #[serde(default)]
    pub planned_seconds: Option<u32>,
    #[serde(default = "default_cycle_index")]
    pub cycle_index: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_cycle_index() -> u32 {
    1
}

impl StartSession {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(planned) = self.planned_seconds {
            ValidationError::check_range("planned_seconds", planned as i64, 1, MAX_PLANNED_SECONDS)?;
        }
        ValidationError::check_range("cycle_index", self.cycle_index as i64, 1, MAX_CYCLE_INDEX)?;
        Ok(())
    }
}

/// Input for editing a running or paused session. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_request() -> StartSession {
        StartSession {
            title: String::new(),
            session_type: SessionType::Focus,
            planned_seconds: None,
            cycle_index: 1,
            tags: Vec::new(),
        }
    }

    #[test]
    fn start_accepts_defaults() {
        assert!(start_request().validate().is_ok());
    }

    #[test]
    fn start_rejects_zero_planned_seconds() {
        let req = StartSession {
            planned_seconds: Some(0),
            ..start_request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn start_rejects_excessive_cycle_index() {
        let req = StartSession {
            cycle_index: 1000,
            ..start_request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn status_activity() {
        assert!(SessionStatus::Running.is_active());
        assert!(SessionStatus::Paused.is_active());
        assert!(!SessionStatus::Completed.is_active());
        assert!(!SessionStatus::Cancelled.is_active());
    }
}
