//! Settings loading with `figment` layers.
//!
//! Loading flow (later layers win):
//! 1. Compiled [`TodoSettings::default()`]
//! 2. `~/.todo/settings.json`, when present
//! 3. `TODO_*` environment variables, nested keys split on `__`
//!    (`TODO_BACKEND__ANON_KEY` sets `backend.anon_key`)
//!
//! The merged result is validated before it is returned.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::TodoSettings;

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "TODO_";

/// Directory holding settings and the persisted session (`~/.todo`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".todo")
}

/// Resolve the path to the settings file (`~/.todo/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Resolve where the session is persisted.
pub fn session_path(settings: &TodoSettings) -> PathBuf {
    settings
        .session
        .storage_path
        .clone()
        .unwrap_or_else(|| data_dir().join("session.json"))
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TodoSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file is not an error; a malformed one is.
pub fn load_settings_from_path(path: &Path) -> Result<TodoSettings> {
    if path.exists() {
        debug!(?path, "loading settings from file");
    } else {
        debug!(?path, "settings file not found, using defaults");
    }

    let settings: TodoSettings = Figment::from(Serialized::defaults(TodoSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;

    validate(&settings)?;
    Ok(settings)
}

/// Reject settings the client cannot run with.
pub fn validate(settings: &TodoSettings) -> Result<()> {
    if settings.backend.url.trim().is_empty() {
        return Err(SettingsError::InvalidValue("backend.url is empty".to_string()));
    }
    if settings.backend.table.trim().is_empty() {
        return Err(SettingsError::InvalidValue("backend.table is empty".to_string()));
    }
    if settings.backend.heartbeat_interval_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "backend.heartbeat_interval_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
