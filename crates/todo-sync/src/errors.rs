//! Synchronizer error types.

use todo_core::{BackendError, TaskId};

/// Errors returned by synchronizer operations.
///
/// Apart from [`SyncError::NotFound`], a failed operation is also recorded in
/// the snapshot's `error` field.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No identity is signed in.
    #[error("please sign in first")]
    Unauthenticated,

    /// The signed-in identity may not perform this mutation.
    #[error("{0}")]
    Unauthorized(String),

    /// The task is not in the local collection.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Input was rejected before any local or backend change.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The data service rejected the call.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// Some of the per-task updates of a reorder failed.
    #[error("reorder failed for {failed} of {total} tasks: {first}")]
    Reorder {
        /// Number of failed updates.
        failed: usize,
        /// Number of updates issued.
        total: usize,
        /// The first failure observed.
        first: BackendError,
    },

    /// The push channel could not be opened.
    #[error("push channel unavailable: {0}")]
    Subscribe(BackendError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
