//! Cross-Platform Path Utilities
//!
//! Functions for resolving the service's data directory across platforms.

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the service data directory (~/.invigil-notify/)
pub fn app_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".invigil-notify"))
}

/// Get the config file path (~/.invigil-notify/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

/// Get the database file path (~/.invigil-notify/data.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("data.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the service data directory, creating if it doesn't exist
pub fn ensure_app_dir() -> AppResult<PathBuf> {
    let path = app_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
