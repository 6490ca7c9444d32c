//! SQLite-backed row store for owners, sessions, settings, memos, tags, and
//! push subscriptions.
//!
//! The store is the enforcement point for the two per-owner invariants:
//! - at most one active (running or paused) session, via a partial unique
//!   index checked on insert;
//! - exactly one settings row, via the primary key plus upsert.
//!
//! State transitions go through conditional updates guarded on the expected
//! status; zero affected rows means the precondition no longer holds.
//!
//! Every operation runs through a retry-once wrapper: a locked/busy database
//! triggers one reconnect (for file-backed stores) and one retry, then the
//! error surfaces.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use crate::error::StoreError;
use crate::memo::Memo;
use crate::owner::OwnerId;
use crate::push::subscription::PushSubscription;
use crate::session::types::{Session, SessionStatus, SessionType};
use crate::settings::{PomodoroSettings, SettingsUpdate};

const SESSION_COLUMNS: &str = "id, owner_id, title, session_type, planned_seconds, \
     actual_seconds, started_at, ended_at, status, cycle_index, created_at, \
     planned_end_at, last_notified_step";

const MEMO_COLUMNS: &str =
    "id, owner_id, title, body_md, log_date, related_session_id, created_at, updated_at";

// === Helper Functions ===

/// Parse session type from database string
fn parse_session_type(value: &str) -> SessionType {
    match value {
        "short_break" => SessionType::ShortBreak,
        "long_break" => SessionType::LongBreak,
        _ => SessionType::Focus,
    }
}

/// Format session type for database storage
fn format_session_type(value: SessionType) -> &'static str {
    match value {
        SessionType::Focus => "focus",
        SessionType::ShortBreak => "short_break",
        SessionType::LongBreak => "long_break",
    }
}

/// Parse session status from database string
fn parse_session_status(value: &str) -> SessionStatus {
    match value {
        "running" => SessionStatus::Running,
        "paused" => SessionStatus::Paused,
        "completed" => SessionStatus::Completed,
        _ => SessionStatus::Cancelled,
    }
}

/// Format session status for database storage
fn format_session_status(value: SessionStatus) -> &'static str {
    match value {
        SessionStatus::Running => "running",
        SessionStatus::Paused => "paused",
        SessionStatus::Completed => "completed",
        SessionStatus::Cancelled => "cancelled",
    }
}

/// Parse a stored timestamp. A trailing `Z` and an explicit offset both work;
/// a timestamp without zone information is assumed UTC; anything unreadable
/// (legacy rows) falls back to the current time.
fn parse_datetime_fallback(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

/// Absent timestamps default to "now" at read time.
fn parse_datetime_or_now(value: Option<String>) -> DateTime<Utc> {
    value
        .as_deref()
        .map(parse_datetime_fallback)
        .unwrap_or_else(Utc::now)
}

fn parse_datetime_opt(value: Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().map(parse_datetime_fallback)
}

fn parse_uuid(value: &str, idx: usize) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Build a Session (tags loaded separately) from a SESSION_COLUMNS row.
fn row_to_session(row: &rusqlite::Row) -> Result<Session, rusqlite::Error> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    let session_type: String = row.get(3)?;
    let started_at: Option<String> = row.get(6)?;
    let ended_at: Option<String> = row.get(7)?;
    let status: String = row.get(8)?;
    let created_at: Option<String> = row.get(10)?;
    let planned_end_at: Option<String> = row.get(11)?;

    Ok(Session {
        id: parse_uuid(&id, 0)?,
        owner: OwnerId::new(parse_uuid(&owner, 1)?),
        title: row.get(2)?,
        session_type: parse_session_type(&session_type),
        planned_seconds: row.get(4)?,
        actual_seconds: row.get(5)?,
        started_at: parse_datetime_or_now(started_at),
        ended_at: parse_datetime_opt(ended_at),
        status: parse_session_status(&status),
        cycle_index: row.get(9)?,
        created_at: parse_datetime_or_now(created_at),
        planned_end_at: parse_datetime_opt(planned_end_at),
        last_notified_step: row.get(12)?,
        tags: Vec::new(),
    })
}

/// Build a Memo (tags loaded separately) from a MEMO_COLUMNS row.
fn row_to_memo(row: &rusqlite::Row) -> Result<Memo, rusqlite::Error> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    let log_date: String = row.get(4)?;
    let related: Option<String> = row.get(5)?;
    let created_at: Option<String> = row.get(6)?;
    let updated_at: Option<String> = row.get(7)?;

    Ok(Memo {
        id: parse_uuid(&id, 0)?,
        owner: OwnerId::new(parse_uuid(&owner, 1)?),
        title: row.get(2)?,
        body_md: row.get(3)?,
        log_date: log_date.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        related_session_id: match related {
            Some(value) => Some(parse_uuid(&value, 5)?),
            None => None,
        },
        created_at: parse_datetime_or_now(created_at),
        updated_at: parse_datetime_or_now(updated_at),
        tags: Vec::new(),
    })
}

fn row_to_subscription(row: &rusqlite::Row) -> Result<PushSubscription, rusqlite::Error> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    Ok(PushSubscription {
        id: parse_uuid(&id, 0)?,
        owner: OwnerId::new(parse_uuid(&owner, 1)?),
        endpoint: row.get(2)?,
        p256dh: row.get(3)?,
        auth: row.get(4)?,
    })
}

/// Load tag names attached through a join table, in attachment order.
fn load_tags(
    conn: &Connection,
    join_table: &str,
    fk_column: &str,
    entity_id: &str,
) -> Result<Vec<String>, rusqlite::Error> {
    let sql = format!(
        "SELECT t.name FROM {join_table} jt JOIN tags t ON t.id = jt.tag_id \
         WHERE jt.{fk_column} = ?1 ORDER BY jt.rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![entity_id], |row| row.get::<_, String>(0))?;
    rows.collect()
}

/// Replace all tag assignments for one entity inside the caller's
/// transaction. `names` must already be normalized.
fn replace_tags(
    conn: &Connection,
    owner: &OwnerId,
    join_table: &str,
    fk_column: &str,
    entity_id: &str,
    names: &[String],
) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!("DELETE FROM {join_table} WHERE {fk_column} = ?1"),
        params![entity_id],
    )?;
    for name in names {
        conn.execute(
            "INSERT INTO tags (id, owner_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id, name) DO NOTHING",
            params![Uuid::new_v4().to_string(), owner.to_string(), name],
        )?;
        let tag_id: String = conn.query_row(
            "SELECT id FROM tags WHERE owner_id = ?1 AND name = ?2",
            params![owner.to_string(), name],
            |row| row.get(0),
        )?;
        conn.execute(
            &format!("INSERT OR IGNORE INTO {join_table} ({fk_column}, tag_id) VALUES (?1, ?2)"),
            params![entity_id, tag_id],
        )?;
    }
    Ok(())
}

/// SQLite row store.
pub struct Store {
    conn: Connection,
    /// None for in-memory stores, which cannot be usefully reopened.
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store at `~/.config/focuslog/focuslog.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(data_dir()?.join("focuslog.db"))
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let store = Self {
            conn,
            path: Some(path),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests and ephemeral use).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let store = Self { conn, path: None };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS owners (
                    id           TEXT PRIMARY KEY,
                    display_name TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS pomodoro_settings (
                    owner_id            TEXT PRIMARY KEY,
                    focus_minutes       INTEGER NOT NULL DEFAULT 25,
                    short_break_minutes INTEGER NOT NULL DEFAULT 5,
                    long_break_minutes  INTEGER NOT NULL DEFAULT 20,
                    long_break_every    INTEGER NOT NULL DEFAULT 4,
                    updated_at          TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    id                 TEXT PRIMARY KEY,
                    owner_id           TEXT NOT NULL,
                    title              TEXT NOT NULL DEFAULT '',
                    session_type       TEXT NOT NULL,
                    planned_seconds    INTEGER NOT NULL,
                    actual_seconds     INTEGER NOT NULL DEFAULT 0,
                    started_at         TEXT,
                    ended_at           TEXT,
                    status             TEXT NOT NULL,
                    cycle_index        INTEGER NOT NULL DEFAULT 1,
                    created_at         TEXT NOT NULL,
                    planned_end_at     TEXT,
                    last_notified_step INTEGER NOT NULL DEFAULT -1
                );

                -- Mutual exclusion: one running/paused session per owner,
                -- enforced here rather than in application logic.
                CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active
                    ON sessions(owner_id) WHERE status IN ('running', 'paused');
                CREATE INDEX IF NOT EXISTS idx_sessions_owner_created
                    ON sessions(owner_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_sessions_status
                    ON sessions(status);

                CREATE TABLE IF NOT EXISTS tags (
                    id       TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    name     TEXT NOT NULL,
                    UNIQUE(owner_id, name)
                );

                CREATE TABLE IF NOT EXISTS session_tags (
                    session_id TEXT NOT NULL,
                    tag_id     TEXT NOT NULL,
                    PRIMARY KEY (session_id, tag_id)
                );

                CREATE TABLE IF NOT EXISTS memos (
                    id                 TEXT PRIMARY KEY,
                    owner_id           TEXT NOT NULL,
                    title              TEXT NOT NULL DEFAULT '',
                    body_md            TEXT NOT NULL,
                    log_date           TEXT NOT NULL,
                    related_session_id TEXT,
                    created_at         TEXT NOT NULL,
                    updated_at         TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_memos_owner_log_date
                    ON memos(owner_id, log_date);

                CREATE TABLE IF NOT EXISTS memo_tags (
                    memo_id TEXT NOT NULL,
                    tag_id  TEXT NOT NULL,
                    PRIMARY KEY (memo_id, tag_id)
                );

                CREATE TABLE IF NOT EXISTS push_subscriptions (
                    id         TEXT PRIMARY KEY,
                    owner_id   TEXT NOT NULL,
                    endpoint   TEXT NOT NULL,
                    p256dh     TEXT NOT NULL,
                    auth       TEXT NOT NULL,
                    is_active  INTEGER NOT NULL DEFAULT 1,
                    updated_at TEXT NOT NULL,
                    UNIQUE(owner_id, endpoint)
                );",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    /// Re-establish the connection after a transient failure. In-memory
    /// stores keep their connection; reopening would lose the data.
    fn reconnect(&mut self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            tracing::debug!(path = %path.display(), "reconnecting store");
            self.conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Run an operation, retrying exactly once after a reconnect when the
    /// failure is transient (locked/busy). Any other failure propagates
    /// immediately.
    fn with_retry<T, F>(&mut self, op: F) -> Result<T, StoreError>
    where
        F: Fn(&Connection) -> Result<T, rusqlite::Error>,
    {
        match op(&self.conn).map_err(StoreError::from) {
            Err(err) if err.is_transient() => {
                self.reconnect()?;
                op(&self.conn).map_err(StoreError::from)
            }
            result => result,
        }
    }

    // ── Owners ───────────────────────────────────────────────────────

    /// Provision an owner row. Idempotent; called on each mutating cold path
    /// instead of being memoized per process.
    pub fn ensure_owner(&mut self, owner: &OwnerId, display_name: &str) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let display_name = display_name.to_string();
        self.with_retry(move |conn| {
            conn.execute(
                "INSERT INTO owners (id, display_name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO NOTHING",
                params![owner, display_name],
            )?;
            Ok(())
        })
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Fetch the owner's settings row, creating it with column defaults when
    /// absent. Concurrent first reads race on the primary key and both see
    /// the single surviving row.
    pub fn get_or_create_settings(
        &mut self,
        owner: &OwnerId,
        now: DateTime<Utc>,
    ) -> Result<PomodoroSettings, StoreError> {
        let owner_key = owner.to_string();
        let owner = *owner;
        self.with_retry(move |conn| {
            conn.execute(
                "INSERT INTO pomodoro_settings (owner_id, updated_at) VALUES (?1, ?2)
                 ON CONFLICT(owner_id) DO NOTHING",
                params![owner_key, now.to_rfc3339()],
            )?;
            conn.query_row(
                "SELECT focus_minutes, short_break_minutes, long_break_minutes,
                        long_break_every, updated_at
                 FROM pomodoro_settings WHERE owner_id = ?1",
                params![owner_key],
                |row| {
                    let updated_at: Option<String> = row.get(4)?;
                    Ok(PomodoroSettings {
                        owner,
                        focus_minutes: row.get(0)?,
                        short_break_minutes: row.get(1)?,
                        long_break_minutes: row.get(2)?,
                        long_break_every: row.get(3)?,
                        updated_at: parse_datetime_or_now(updated_at),
                    })
                },
            )
        })
    }

    /// Replace all four settings fields, creating the row if needed.
    pub fn upsert_settings(
        &mut self,
        owner: &OwnerId,
        update: &SettingsUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let update = update.clone();
        self.with_retry(move |conn| {
            conn.execute(
                "INSERT INTO pomodoro_settings
                     (owner_id, focus_minutes, short_break_minutes,
                      long_break_minutes, long_break_every, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(owner_id) DO UPDATE SET
                     focus_minutes = excluded.focus_minutes,
                     short_break_minutes = excluded.short_break_minutes,
                     long_break_minutes = excluded.long_break_minutes,
                     long_break_every = excluded.long_break_every,
                     updated_at = excluded.updated_at",
                params![
                    owner,
                    update.focus_minutes,
                    update.short_break_minutes,
                    update.long_break_minutes,
                    update.long_break_every,
                    now.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Insert a new session row. The partial unique index rejects a second
    /// active session for the owner; that surfaces as
    /// [`StoreError::UniqueViolation`].
    pub fn insert_session(&mut self, session: &Session) -> Result<(), StoreError> {
        let session = session.clone();
        self.with_retry(move |conn| {
            conn.execute(
                &format!("INSERT INTO sessions ({SESSION_COLUMNS}) \
                          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    session.id.to_string(),
                    session.owner.to_string(),
                    session.title,
                    format_session_type(session.session_type),
                    session.planned_seconds,
                    session.actual_seconds,
                    session.started_at.to_rfc3339(),
                    session.ended_at.map(|t| t.to_rfc3339()),
                    format_session_status(session.status),
                    session.cycle_index,
                    session.created_at.to_rfc3339(),
                    session.planned_end_at.map(|t| t.to_rfc3339()),
                    session.last_notified_step,
                ],
            )?;
            Ok(())
        })
    }

    /// Conditionally write a session's mutable fields, guarded on the status
    /// the caller observed. Returns false when no row matched, i.e. the
    /// session vanished or transitioned concurrently.
    pub fn update_session_guarded(
        &mut self,
        session: &Session,
        expected: &[SessionStatus],
    ) -> Result<bool, StoreError> {
        let session = session.clone();
        let guard = expected
            .iter()
            .map(|s| format!("'{}'", format_session_status(*s)))
            .collect::<Vec<_>>()
            .join(", ");
        self.with_retry(move |conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE sessions SET
                         title = ?3, actual_seconds = ?4, started_at = ?5,
                         ended_at = ?6, status = ?7, planned_end_at = ?8,
                         last_notified_step = ?9
                     WHERE id = ?1 AND owner_id = ?2 AND status IN ({guard})"
                ),
                params![
                    session.id.to_string(),
                    session.owner.to_string(),
                    session.title,
                    session.actual_seconds,
                    session.started_at.to_rfc3339(),
                    session.ended_at.map(|t| t.to_rfc3339()),
                    format_session_status(session.status),
                    session.planned_end_at.map(|t| t.to_rfc3339()),
                    session.last_notified_step,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Fetch one session within the owner's scope, tags included.
    pub fn get_session(
        &mut self,
        owner: &OwnerId,
        id: &Uuid,
    ) -> Result<Option<Session>, StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();
        self.with_retry(move |conn| {
            let session = conn
                .query_row(
                    &format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND owner_id = ?2"
                    ),
                    params![id, owner],
                    row_to_session,
                )
                .optional()?;
            match session {
                Some(mut session) => {
                    session.tags = load_tags(conn, "session_tags", "session_id", &id)?;
                    Ok(Some(session))
                }
                None => Ok(None),
            }
        })
    }

    /// The owner's single running/paused session, if any. Should the
    /// invariant ever be violated, the most-recently-created row wins.
    pub fn active_session(&mut self, owner: &OwnerId) -> Result<Option<Session>, StoreError> {
        let owner = owner.to_string();
        self.with_retry(move |conn| {
            let session = conn
                .query_row(
                    &format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions
                         WHERE owner_id = ?1 AND status IN ('running', 'paused')
                         ORDER BY created_at DESC LIMIT 1"
                    ),
                    params![owner],
                    row_to_session,
                )
                .optional()?;
            match session {
                Some(mut session) => {
                    let id = session.id.to_string();
                    session.tags = load_tags(conn, "session_tags", "session_id", &id)?;
                    Ok(Some(session))
                }
                None => Ok(None),
            }
        })
    }

    /// Session history for the owner, newest first.
    pub fn list_sessions(
        &mut self,
        owner: &OwnerId,
        limit: u32,
    ) -> Result<Vec<Session>, StoreError> {
        let owner = owner.to_string();
        self.with_retry(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE owner_id = ?1
                 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let mut sessions = stmt
                .query_map(params![owner, limit], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            for session in &mut sessions {
                let id = session.id.to_string();
                session.tags = load_tags(conn, "session_tags", "session_id", &id)?;
            }
            Ok(sessions)
        })
    }

    /// All running sessions across owners, for a notification dispatch pass.
    pub fn running_sessions(&mut self) -> Result<Vec<Session>, StoreError> {
        self.with_retry(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE status = 'running'"
            ))?;
            let mut sessions = stmt
                .query_map([], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            for session in &mut sessions {
                let id = session.id.to_string();
                session.tags = load_tags(conn, "session_tags", "session_id", &id)?;
            }
            Ok(sessions)
        })
    }

    /// Record the highest notified overrun step for a session.
    pub fn mark_session_notified(
        &mut self,
        owner: &OwnerId,
        id: &Uuid,
        step: i64,
    ) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();
        self.with_retry(move |conn| {
            conn.execute(
                "UPDATE sessions SET last_notified_step = ?3
                 WHERE id = ?1 AND owner_id = ?2",
                params![id, owner, step],
            )?;
            Ok(())
        })
    }

    /// Replace all tags on a session. `names` must already be normalized.
    pub fn replace_session_tags(
        &mut self,
        owner: &OwnerId,
        session_id: &Uuid,
        names: &[String],
    ) -> Result<(), StoreError> {
        let owner = *owner;
        let session_id = session_id.to_string();
        let names = names.to_vec();
        self.with_retry(move |conn| {
            let tx = conn.unchecked_transaction()?;
            replace_tags(&tx, &owner, "session_tags", "session_id", &session_id, &names)?;
            tx.commit()?;
            Ok(())
        })
    }

    // ── Memos ────────────────────────────────────────────────────────

    pub fn insert_memo(&mut self, memo: &Memo) -> Result<(), StoreError> {
        let memo = memo.clone();
        self.with_retry(move |conn| {
            conn.execute(
                &format!("INSERT INTO memos ({MEMO_COLUMNS}) \
                          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    memo.id.to_string(),
                    memo.owner.to_string(),
                    memo.title,
                    memo.body_md,
                    memo.log_date.to_string(),
                    memo.related_session_id.map(|id| id.to_string()),
                    memo.created_at.to_rfc3339(),
                    memo.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_memo(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Option<Memo>, StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();
        self.with_retry(move |conn| {
            let memo = conn
                .query_row(
                    &format!("SELECT {MEMO_COLUMNS} FROM memos WHERE id = ?1 AND owner_id = ?2"),
                    params![id, owner],
                    row_to_memo,
                )
                .optional()?;
            match memo {
                Some(mut memo) => {
                    memo.tags = load_tags(conn, "memo_tags", "memo_id", &id)?;
                    Ok(Some(memo))
                }
                None => Ok(None),
            }
        })
    }

    /// All memos for the owner, newest log date first, then newest created.
    pub fn list_memos(&mut self, owner: &OwnerId) -> Result<Vec<Memo>, StoreError> {
        let owner = owner.to_string();
        self.with_retry(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEMO_COLUMNS} FROM memos WHERE owner_id = ?1
                 ORDER BY log_date DESC, created_at DESC"
            ))?;
            let mut memos = stmt
                .query_map(params![owner], row_to_memo)?
                .collect::<Result<Vec<_>, _>>()?;
            for memo in &mut memos {
                let id = memo.id.to_string();
                memo.tags = load_tags(conn, "memo_tags", "memo_id", &id)?;
            }
            Ok(memos)
        })
    }

    /// Rewrite a memo's content fields. Returns false when the memo does not
    /// exist within the owner's scope.
    pub fn update_memo(&mut self, memo: &Memo) -> Result<bool, StoreError> {
        let memo = memo.clone();
        self.with_retry(move |conn| {
            let changed = conn.execute(
                "UPDATE memos SET title = ?3, body_md = ?4, log_date = ?5,
                     related_session_id = ?6, updated_at = ?7
                 WHERE id = ?1 AND owner_id = ?2",
                params![
                    memo.id.to_string(),
                    memo.owner.to_string(),
                    memo.title,
                    memo.body_md,
                    memo.log_date.to_string(),
                    memo.related_session_id.map(|id| id.to_string()),
                    memo.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a memo and its tag assignments. Returns false when absent.
    pub fn delete_memo(&mut self, owner: &OwnerId, id: &Uuid) -> Result<bool, StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();
        self.with_retry(move |conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM memo_tags WHERE memo_id = ?1", params![id])?;
            let deleted = tx.execute(
                "DELETE FROM memos WHERE id = ?1 AND owner_id = ?2",
                params![id, owner],
            )?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    /// Replace all tags on a memo. `names` must already be normalized.
    pub fn replace_memo_tags(
        &mut self,
        owner: &OwnerId,
        memo_id: &Uuid,
        names: &[String],
    ) -> Result<(), StoreError> {
        let owner = *owner;
        let memo_id = memo_id.to_string();
        let names = names.to_vec();
        self.with_retry(move |conn| {
            let tx = conn.unchecked_transaction()?;
            replace_tags(&tx, &owner, "memo_tags", "memo_id", &memo_id, &names)?;
            tx.commit()?;
            Ok(())
        })
    }

    // ── Push subscriptions ───────────────────────────────────────────

    /// Register or refresh a subscription keyed by (owner, endpoint);
    /// re-registering reactivates a deactivated one.
    pub fn upsert_subscription(
        &mut self,
        owner: &OwnerId,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let endpoint = endpoint.to_string();
        let p256dh = p256dh.to_string();
        let auth = auth.to_string();
        self.with_retry(move |conn| {
            conn.execute(
                "INSERT INTO push_subscriptions
                     (id, owner_id, endpoint, p256dh, auth, is_active, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
                 ON CONFLICT(owner_id, endpoint) DO UPDATE SET
                     p256dh = excluded.p256dh,
                     auth = excluded.auth,
                     is_active = 1,
                     updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    owner,
                    endpoint,
                    p256dh,
                    auth,
                    now.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Mark the subscription with this endpoint inactive. No-op when absent.
    pub fn deactivate_subscription_by_endpoint(
        &mut self,
        owner: &OwnerId,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let endpoint = endpoint.to_string();
        self.with_retry(move |conn| {
            conn.execute(
                "UPDATE push_subscriptions SET is_active = 0, updated_at = ?3
                 WHERE owner_id = ?1 AND endpoint = ?2",
                params![owner, endpoint, now.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Mark a subscription inactive by id (delivery reported it gone).
    pub fn deactivate_subscription(
        &mut self,
        owner: &OwnerId,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();
        self.with_retry(move |conn| {
            conn.execute(
                "UPDATE push_subscriptions SET is_active = 0, updated_at = ?3
                 WHERE id = ?1 AND owner_id = ?2",
                params![id, owner, now.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Active subscriptions for one owner.
    pub fn active_subscriptions(
        &mut self,
        owner: &OwnerId,
    ) -> Result<Vec<PushSubscription>, StoreError> {
        let owner = owner.to_string();
        self.with_retry(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, endpoint, p256dh, auth FROM push_subscriptions
                 WHERE owner_id = ?1 AND is_active = 1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![owner], row_to_subscription)?
                .collect::<Result<Vec<_>, _>>();
            rows
        })
    }

    /// Active subscriptions for each of the given owners.
    pub fn active_subscriptions_by_owner(
        &mut self,
        owners: &[OwnerId],
    ) -> Result<HashMap<OwnerId, Vec<PushSubscription>>, StoreError> {
        let mut map = HashMap::new();
        for owner in owners {
            if map.contains_key(owner) {
                continue;
            }
            let subscriptions = self.active_subscriptions(owner)?;
            map.insert(*owner, subscriptions);
        }
        Ok(map)
    }
}
