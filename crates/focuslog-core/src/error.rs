//! Core error types for focuslog-core.
//!
//! Callers need to tell four failure classes apart: invalid input, a missing
//! record, an illegal state transition, and infrastructure trouble. Each class
//! is a distinct variant so an outer layer (CLI exit codes, an HTTP mapper)
//! can translate without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focuslog-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or out-of-range input, rejected before any state is touched.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced record does not exist within the owner's scope.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Operation is not legal in the record's current state.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Storage-related errors, including the transient-infrastructure class.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str) -> Self {
        CoreError::NotFound { entity }
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        CoreError::StateConflict(message.into())
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Migration failed
    #[error("Store migration failed: {0}")]
    MigrationFailed(String),

    /// Store is locked or busy; retried once before surfacing
    #[error("Store is busy")]
    Busy,
}

impl StoreError {
    /// Whether a single reconnect-and-retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg) => match code.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    StoreError::Busy
                }
                rusqlite::ErrorCode::ConstraintViolation => StoreError::UniqueViolation(
                    msg.clone().unwrap_or_else(|| code.to_string()),
                ),
                _ => StoreError::QueryFailed(err.to_string()),
            },
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value outside its documented range
    #[error("Value for '{field}' must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// Required field is empty
    #[error("'{field}' must not be empty")]
    Empty { field: &'static str },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl ValidationError {
    /// Range check helper; returns the value on success so checks chain.
    pub fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, Self> {
        if value < min || value > max {
            return Err(ValidationError::OutOfRange { field, min, max });
        }
        Ok(value)
    }

    pub fn check_non_empty(field: &'static str, value: &str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field });
        }
        Ok(())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_bounds_inclusive() {
        assert!(ValidationError::check_range("focus_minutes", 1, 1, 180).is_ok());
        assert!(ValidationError::check_range("focus_minutes", 180, 1, 180).is_ok());
        assert!(ValidationError::check_range("focus_minutes", 0, 1, 180).is_err());
        assert!(ValidationError::check_range("focus_minutes", 181, 1, 180).is_err());
    }

    #[test]
    fn busy_is_transient() {
        assert!(StoreError::Busy.is_transient());
        assert!(!StoreError::QueryFailed("boom".into()).is_transient());
    }
}
