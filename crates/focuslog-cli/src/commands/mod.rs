//! CLI command implementations.
//!
//! Every command opens the store, resolves the acting owner (the `--owner`
//! flag, falling back to the configured identity), calls into
//! `focuslog-core`, and prints the result as pretty JSON on stdout.

pub mod memo;
pub mod push;
pub mod session;
pub mod settings;
pub mod stats;

use focuslog_core::{AppConfig, ConfigError, CoreError, OwnerId, Store, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::Core(err.into())
    }
}

impl CliError {
    /// Process exit code: 2 invalid input, 3 missing record, 4 illegal state
    /// transition, 1 anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(CoreError::Validation(_)) => 2,
            CliError::Core(CoreError::NotFound { .. }) => 3,
            CliError::Core(CoreError::StateConflict(_)) => 4,
            _ => 1,
        }
    }
}

/// Open store plus the owner the invocation acts as.
pub struct Context {
    pub store: Store,
    pub owner: OwnerId,
    pub config: AppConfig,
}

pub fn context(owner: Option<OwnerId>) -> Result<Context, CliError> {
    let config = AppConfig::load()?;
    let owner = owner.unwrap_or(config.owner_id);
    let store = Store::open()?;
    Ok(Context {
        store,
        owner,
        config,
    })
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
