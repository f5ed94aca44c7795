//! Data service contract for the task table.

use async_trait::async_trait;
use todo_core::{BackendError, NewTask, Task, TaskId, TaskPatch};

/// Client-side handle to the task table.
///
/// All tasks are visible to every authenticated user; write permissions are
/// enforced by the service's access policy.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task, ordered by category then `sort_order`.
    async fn select_all(&self) -> Result<Vec<Task>, BackendError>;

    /// Insert and return the created row (authoritative id and timestamps).
    async fn insert(&self, task: &NewTask) -> Result<Task, BackendError>;

    /// Apply `patch` to the row with `id` and return the updated row.
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, BackendError>;

    /// Delete the row with `id`.
    async fn delete(&self, id: &TaskId) -> Result<(), BackendError>;
}
