//! Journal-style memo notes.
//!
//! Plain CRUD over markdown memos, each pinned to a log date and optionally
//! linked to a session. Tag assignments are replaced wholesale on create and
//! update, never merged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CoreError, ValidationError};
use crate::owner::OwnerId;
use crate::storage::Store;
use crate::tags;

/// Persisted memo record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memo {
    pub id: Uuid,
    pub owner: OwnerId,
    pub title: String,
    pub body_md: String,
    pub log_date: NaiveDate,
    pub related_session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Input for creating or rewriting a memo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoDraft {
    #[serde(default)]
    pub title: String,
    pub body_md: String,
    pub log_date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_session_id: Option<Uuid>,
}

impl MemoDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_non_empty("body_md", &self.body_md)
    }
}

/// Memo use cases over the store.
pub struct MemoService<'a> {
    store: &'a mut Store,
    clock: &'a dyn Clock,
}

impl<'a> MemoService<'a> {
    pub fn new(store: &'a mut Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// All memos for the owner, newest log date first.
    pub fn list(&mut self, owner: &OwnerId) -> Result<Vec<Memo>, CoreError> {
        Ok(self.store.list_memos(owner)?)
    }

    pub fn get(&mut self, owner: &OwnerId, id: &Uuid) -> Result<Memo, CoreError> {
        self.store
            .get_memo(owner, id)?
            .ok_or(CoreError::not_found("memo"))
    }

    pub fn create(&mut self, owner: &OwnerId, draft: MemoDraft) -> Result<Memo, CoreError> {
        draft.validate()?;
        self.store.ensure_owner(owner, "")?;

        let now = self.clock.now();
        let memo = Memo {
            id: Uuid::new_v4(),
            owner: *owner,
            title: draft.title.trim().to_string(),
            body_md: draft.body_md,
            log_date: draft.log_date,
            related_session_id: draft.related_session_id,
            created_at: now,
            updated_at: now,
            tags: tags::normalize(&draft.tags),
        };
        self.store.insert_memo(&memo)?;
        self.store.replace_memo_tags(owner, &memo.id, &memo.tags)?;
        Ok(memo)
    }

    /// Rewrite a memo and replace its tag assignments.
    pub fn update(
        &mut self,
        owner: &OwnerId,
        id: &Uuid,
        draft: MemoDraft,
    ) -> Result<Memo, CoreError> {
        draft.validate()?;
        let mut memo = self.get(owner, id)?;

        memo.title = draft.title.trim().to_string();
        memo.body_md = draft.body_md;
        memo.log_date = draft.log_date;
        memo.related_session_id = draft.related_session_id;
        memo.updated_at = self.clock.now();
        memo.tags = tags::normalize(&draft.tags);

        if !self.store.update_memo(&memo)? {
            return Err(CoreError::not_found("memo"));
        }
        self.store.replace_memo_tags(owner, &memo.id, &memo.tags)?;
        Ok(memo)
    }

    pub fn delete(&mut self, owner: &OwnerId, id: &Uuid) -> Result<(), CoreError> {
        if !self.store.delete_memo(owner, id)? {
            return Err(CoreError::not_found("memo"));
        }
        Ok(())
    }
}
