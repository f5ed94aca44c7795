//! Data surface (`/rest/v1/<table>`).

use async_trait::async_trait;
use reqwest::Method;
use todo_core::{BackendError, NewTask, Task, TaskId, TaskPatch};
use todo_sync::TaskStore;
use tracing::instrument;

use super::RestBackend;
use super::client::{read_json, transport_error};

/// Ask for the affected row back as a single JSON object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

impl RestBackend {
    fn table_path(&self) -> String {
        format!("/rest/v1/{}", self.inner.config.table)
    }
}

fn id_filter(id: &TaskId) -> String {
    format!("eq.{id}")
}

#[async_trait]
impl TaskStore for RestBackend {
    #[instrument(skip_all)]
    async fn select_all(&self) -> Result<Vec<Task>, BackendError> {
        let resp = self
            .request(Method::GET, &self.table_path())
            .query(&[("select", "*"), ("order", "category.asc,sort_order.asc")])
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        read_json(resp).await
    }

    #[instrument(skip_all, fields(category = %task.category))]
    async fn insert(&self, task: &NewTask) -> Result<Task, BackendError> {
        let resp = self
            .request(Method::POST, &self.table_path())
            .header("Prefer", RETURN_REPRESENTATION)
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(task)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        read_json(resp).await
    }

    #[instrument(skip_all, fields(task_id = %id))]
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, BackendError> {
        let resp = self
            .request(Method::PATCH, &self.table_path())
            .query(&[("id", id_filter(id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .json(patch)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        read_json(resp).await
    }

    /// The table silently skips rows the policy hides, so an empty
    /// representation is reported as a rejection.
    #[instrument(skip_all, fields(task_id = %id))]
    async fn delete(&self, id: &TaskId) -> Result<(), BackendError> {
        let resp = self
            .request(Method::DELETE, &self.table_path())
            .query(&[("id", id_filter(id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let deleted: Vec<Task> = read_json(resp).await?;
        if deleted.is_empty() {
            return Err(BackendError::policy(
                "task was not deleted: it is gone or you may not delete it",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
