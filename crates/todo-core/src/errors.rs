//! Backend error shape shared by every collaborator contract.
//!
//! Every auth, data and push-channel call either succeeds or yields a
//! [`BackendError`] carrying at least a human-readable `message`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure reported by (or on the way to) the backend.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable reason, shown to the user as-is.
    pub message: String,
    /// HTTP status when the failure came from a response (0 for transport errors).
    #[serde(default)]
    pub status: u16,
    /// Backend-defined error code, when one was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl BackendError {
    /// Error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 0,
            code: None,
        }
    }

    /// Error from an HTTP response status.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            code: None,
        }
    }

    /// Attach a backend error code.
    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Access-policy rejection (row-level security, ownership).
    pub fn policy(message: impl Into<String>) -> Self {
        Self::with_status(403, message).code("42501")
    }

    /// Whether this is an access-policy rejection.
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        self.status == 403 || self.code.as_deref() == Some("42501")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
