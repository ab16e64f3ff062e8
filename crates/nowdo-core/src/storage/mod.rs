pub mod config;
pub mod migrations;
pub mod sqlite;

pub use config::Config;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::error::StoreError;

/// Returns the nowdo data directory, creating it if needed.
///
/// `NOWDO_DATA_DIR` wins when set. Otherwise `~/.config/nowdo`, or
/// `~/.config/nowdo-dev` when `NOWDO_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dir = match std::env::var_os("NOWDO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("NOWDO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("nowdo-dev")
            } else {
                base_dir.join("nowdo")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StoreError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
