//! Session lifecycle state machine.
//!
//! States: running, paused, completed, cancelled (terminal). A session exists
//! only once started; there is no idle state. At most one running/paused
//! session exists per owner -- the store's partial unique index enforces this
//! atomically against concurrent starts, and transitions use conditional
//! updates so a concurrently-moved session surfaces as a state conflict
//! rather than a lost write.

use uuid::Uuid;

use super::accounting;
use super::summary::{summarize, SummaryGroupBy, SummaryRow};
use super::types::{Session, SessionPatch, SessionStatus, SessionType, StartSession};
use crate::clock::Clock;
use crate::error::{CoreError, StoreError};
use crate::owner::OwnerId;
use crate::storage::Store;
use crate::tags;

/// History queries load at most this many rows.
const MAX_LIST_LIMIT: u32 = 500;

/// Session lifecycle use cases over the store.
pub struct SessionService<'a> {
    store: &'a mut Store,
    clock: &'a dyn Clock,
}

impl<'a> SessionService<'a> {
    pub fn new(store: &'a mut Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Start a new session. Fails with a state conflict while the owner
    /// already has a running or paused session.
    pub fn start(&mut self, owner: &OwnerId, request: StartSession) -> Result<Session, CoreError> {
        request.validate()?;
        self.store.ensure_owner(owner, "")?;

        // Friendly pre-check; the unique index below is the real guarantee.
        if self.store.active_session(owner)?.is_some() {
            return Err(CoreError::state_conflict("an active session already exists"));
        }

        let now = self.clock.now();
        let planned_seconds = match request.planned_seconds {
            Some(seconds) => seconds,
            None => self
                .store
                .get_or_create_settings(owner, now)?
                .default_planned_seconds(request.session_type),
        };

        let session = Session {
            id: Uuid::new_v4(),
            owner: *owner,
            title: request.title.trim().to_string(),
            session_type: request.session_type,
            planned_seconds,
            actual_seconds: 0,
            started_at: now,
            ended_at: None,
            status: SessionStatus::Running,
            cycle_index: request.cycle_index,
            created_at: now,
            planned_end_at: Some(accounting::planned_end_at(now, planned_seconds)),
            last_notified_step: -1,
            tags: tags::normalize(&request.tags),
        };

        match self.store.insert_session(&session) {
            Ok(()) => {}
            // Concurrent start lost the race on the active-session index.
            Err(StoreError::UniqueViolation(_)) => {
                return Err(CoreError::state_conflict("an active session already exists"));
            }
            Err(err) => return Err(err.into()),
        }
        self.store
            .replace_session_tags(owner, &session.id, &session.tags)?;
        Ok(session)
    }

    /// Pause a running session, committing the elapsed time of the current
    /// interval (capped at the planned duration).
    pub fn pause(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Session, CoreError> {
        let mut session = self.get_required(owner, id)?;
        if session.status != SessionStatus::Running {
            return Err(CoreError::state_conflict("session is not running"));
        }

        let now = self.clock.now();
        session.actual_seconds = session
            .planned_seconds
            .min(accounting::elapsed_seconds(&session, now));
        session.status = SessionStatus::Paused;
        session.planned_end_at = None;

        self.commit_transition(&session, &[SessionStatus::Running], "session is not running")?;
        Ok(session)
    }

    /// Resume a paused session. The committed total stays untouched; the new
    /// running interval starts now, due after the remaining time.
    pub fn resume(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Session, CoreError> {
        let mut session = self.get_required(owner, id)?;
        if session.status != SessionStatus::Paused {
            return Err(CoreError::state_conflict("session is not paused"));
        }

        let now = self.clock.now();
        let remaining = session
            .planned_seconds
            .saturating_sub(session.actual_seconds);
        session.started_at = now;
        session.planned_end_at = Some(accounting::planned_end_at(now, remaining));
        session.status = SessionStatus::Running;

        self.commit_transition(&session, &[SessionStatus::Paused], "session is not paused")?;
        Ok(session)
    }

    /// Edit the title and/or tags of an active session. Timing fields are
    /// never touched; absent fields are left unchanged.
    pub fn update(
        &mut self,
        owner: &OwnerId,
        id: &Uuid,
        patch: SessionPatch,
    ) -> Result<Session, CoreError> {
        let mut session = self.get_required(owner, id)?;
        if !session.status.is_active() {
            return Err(CoreError::state_conflict("session is already finished"));
        }

        if let Some(title) = patch.title {
            session.title = title.trim().to_string();
        }
        self.commit_transition(
            &session,
            &[SessionStatus::Running, SessionStatus::Paused],
            "session is already finished",
        )?;

        if let Some(new_tags) = patch.tags {
            session.tags = tags::normalize(&new_tags);
            self.store
                .replace_session_tags(owner, &session.id, &session.tags)?;
        }
        Ok(session)
    }

    /// Finish an active session.
    pub fn finish(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Session, CoreError> {
        self.close(owner, id, SessionStatus::Completed)
    }

    /// Cancel an active session. Identical to finish except for the terminal
    /// status.
    pub fn cancel(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Session, CoreError> {
        self.close(owner, id, SessionStatus::Cancelled)
    }

    /// The owner's single running/paused session, if any.
    pub fn get_current(&mut self, owner: &OwnerId) -> Result<Option<Session>, CoreError> {
        Ok(self.store.active_session(owner)?)
    }

    /// Session history, newest first. The limit is clamped to 1..=500.
    pub fn list(&mut self, owner: &OwnerId, limit: u32) -> Result<Vec<Session>, CoreError> {
        Ok(self.store.list_sessions(owner, limit.clamp(1, MAX_LIST_LIMIT))?)
    }

    /// Aggregate the owner's completed focus sessions per period.
    pub fn summary(
        &mut self,
        owner: &OwnerId,
        group_by: SummaryGroupBy,
    ) -> Result<Vec<SummaryRow>, CoreError> {
        let sessions = self.store.list_sessions(owner, MAX_LIST_LIMIT)?;
        Ok(summarize(&sessions, group_by))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn get_required(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Session, CoreError> {
        self.store
            .get_session(owner, id)?
            .ok_or(CoreError::not_found("session"))
    }

    /// Shared close path for finish and cancel. `ended_at` and the terminal
    /// status are set exactly once; a repeat close is a state conflict.
    fn close(
        &mut self,
        owner: &OwnerId,
        id: &Uuid,
        target: SessionStatus,
    ) -> Result<Session, CoreError> {
        let mut session = self.get_required(owner, id)?;
        if !session.status.is_active() {
            return Err(CoreError::state_conflict("session is already finished"));
        }

        let now = self.clock.now();
        session.actual_seconds = session
            .planned_seconds
            .min(accounting::elapsed_seconds(&session, now));
        session.ended_at = Some(now);
        session.status = target;
        session.planned_end_at = None;

        self.commit_transition(
            &session,
            &[SessionStatus::Running, SessionStatus::Paused],
            "session is already finished",
        )?;
        Ok(session)
    }

    /// Write a transition guarded on the status we read; zero affected rows
    /// means the session moved concurrently.
    fn commit_transition(
        &mut self,
        session: &Session,
        expected: &[SessionStatus],
        conflict_message: &str,
    ) -> Result<(), CoreError> {
        if self.store.update_session_guarded(session, expected)? {
            Ok(())
        } else {
            Err(CoreError::state_conflict(conflict_message))
        }
    }
}
