//! Per-owner Pomodoro settings.
//!
//! One row per owner, created lazily with defaults on first read and only
//! ever replaced wholesale. The durations feed the default planned length of
//! each session type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{CoreError, ValidationError};
use crate::owner::OwnerId;
use crate::session::types::SessionType;
use crate::storage::Store;

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 20;
pub const DEFAULT_LONG_BREAK_EVERY: u32 = 4;

/// Persisted settings row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroSettings {
    pub owner: OwnerId,
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_every: u32,
    pub updated_at: DateTime<Utc>,
}

impl PomodoroSettings {
    /// Default planned duration for a session type, in seconds.
    pub fn default_planned_seconds(&self, session_type: SessionType) -> u32 {
        let minutes = match session_type {
            SessionType::Focus => self.focus_minutes,
            SessionType::ShortBreak => self.short_break_minutes,
            SessionType::LongBreak => self.long_break_minutes,
        };
        minutes * 60
    }
}

/// Full-replacement settings update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_every: u32,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range("focus_minutes", self.focus_minutes as i64, 1, 180)?;
        ValidationError::check_range(
            "short_break_minutes",
            self.short_break_minutes as i64,
            1,
            60,
        )?;
        ValidationError::check_range("long_break_minutes", self.long_break_minutes as i64, 1, 120)?;
        ValidationError::check_range("long_break_every", self.long_break_every as i64, 2, 12)?;
        Ok(())
    }
}

/// Settings use cases over the store.
pub struct SettingsService<'a> {
    store: &'a mut Store,
    clock: &'a dyn Clock,
}

impl<'a> SettingsService<'a> {
    pub fn new(store: &'a mut Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Return the owner's settings, creating the row with defaults on first
    /// access. Idempotent under concurrent first reads.
    pub fn get(&mut self, owner: &OwnerId) -> Result<PomodoroSettings, CoreError> {
        self.store.ensure_owner(owner, "")?;
        Ok(self.store.get_or_create_settings(owner, self.clock.now())?)
    }

    /// Validate and replace all four duration fields.
    pub fn update(
        &mut self,
        owner: &OwnerId,
        update: SettingsUpdate,
    ) -> Result<PomodoroSettings, CoreError> {
        update.validate()?;
        self.store.ensure_owner(owner, "")?;
        let now = self.clock.now();
        self.store.upsert_settings(owner, &update, now)?;
        Ok(self.store.get_or_create_settings(owner, now)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
    }

    #[test]
    fn first_read_creates_defaults() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let settings = SettingsService::new(&mut store, &clock)
            .get(&owner)
            .unwrap();
        assert_eq!(settings.focus_minutes, DEFAULT_FOCUS_MINUTES);
        assert_eq!(settings.long_break_every, DEFAULT_LONG_BREAK_EVERY);
        assert_eq!(settings.default_planned_seconds(SessionType::Focus), 1500);
        assert_eq!(
            settings.default_planned_seconds(SessionType::ShortBreak),
            300
        );
    }

    #[test]
    fn update_replaces_all_fields() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let mut service = SettingsService::new(&mut store, &clock);
        let updated = service
            .update(
                &owner,
                SettingsUpdate {
                    focus_minutes: 50,
                    short_break_minutes: 10,
                    long_break_minutes: 30,
                    long_break_every: 3,
                },
            )
            .unwrap();
        assert_eq!(updated.focus_minutes, 50);
        assert_eq!(updated.default_planned_seconds(SessionType::LongBreak), 1800);

        let read_back = service.get(&owner).unwrap();
        assert_eq!(read_back.short_break_minutes, 10);
    }

    #[test]
    fn update_rejects_out_of_range_fields() {
        let mut store = Store::open_memory().unwrap();
        let clock = clock();
        let owner = OwnerId::generate();
        let mut service = SettingsService::new(&mut store, &clock);
        let err = service
            .update(
                &owner,
                SettingsUpdate {
                    focus_minutes: 0,
                    short_break_minutes: 5,
                    long_break_minutes: 20,
                    long_break_every: 4,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // Nothing was written.
        let settings = service.get(&owner).unwrap();
        assert_eq!(settings.focus_minutes, DEFAULT_FOCUS_MINUTES);
    }
}
