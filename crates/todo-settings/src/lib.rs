//! # todo-settings
//!
//! Configuration for the shared to-do list client, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`TodoSettings::default()`]
//! 2. **User file**: `~/.todo/settings.json`
//! 3. **Environment variables**: `TODO_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    data_dir, load_settings, load_settings_from_path, session_path, settings_path, validate,
};
pub use types::{BackendSettings, LoggingSettings, SessionSettings, TodoSettings};
