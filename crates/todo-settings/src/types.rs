//! Settings type definitions.
//!
//! Keys are snake case so that file keys and `TODO_*` environment overrides
//! name the same fields. Every section implements [`Default`] and is marked
//! `#[serde(default)]`, so partial files are accepted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings for the to-do client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoSettings {
    /// Hosted backend connection.
    pub backend: BackendSettings,
    /// Session persistence.
    pub session: SessionSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Hosted backend connection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL of the backend project (auth, rest and realtime live under it).
    pub url: String,
    /// Public anonymous key sent as the `apikey` header.
    pub anon_key: String,
    /// Task table name.
    pub table: String,
    /// Push channel name.
    pub channel: String,
    /// Push channel heartbeat interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            anon_key: String::new(),
            table: "todos".to_string(),
            channel: "todos-changes".to_string(),
            heartbeat_interval_ms: 30_000,
            request_timeout_ms: 10_000,
        }
    }
}

/// Session persistence settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Persist the session between runs.
    pub persist: bool,
    /// Override for the session file (defaults to `~/.todo/session.json`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persist: true,
            storage_path: None,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
