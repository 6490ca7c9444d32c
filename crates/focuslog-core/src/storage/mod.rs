pub mod store;

pub use store::Store;

use std::path::PathBuf;

use crate::error::StoreError;

/// Returns `~/.config/focuslog[-dev]/` based on FOCUSLOG_ENV.
///
/// Set FOCUSLOG_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSLOG_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focuslog-dev")
    } else {
        base_dir.join("focuslog")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StoreError::QueryFailed(format!("cannot create data dir: {e}")))?;
    Ok(dir)
}
