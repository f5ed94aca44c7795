//! Auth error types.

use todo_core::BackendError;

/// Errors surfaced by the session manager.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The auth service rejected the call (duplicate email, weak password,
    /// bad credentials, network failure).
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// Input was rejected before reaching the service.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AuthError {
    /// The human-readable reason, as shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::Backend(e) => e.message.clone(),
            Self::InvalidInput(m) => m.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
