//! Task table and push channel over the in-process store.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use todo_core::{BackendError, Identity, NewTask, Task, TaskId, TaskPatch};
use todo_sync::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, TaskStore};
use tracing::{debug, instrument, warn};

use super::{MemoryClient, Operation, Shared};

impl MemoryClient {
    fn require_user(&self, action: &str) -> Result<Identity, BackendError> {
        self.current_user()
            .ok_or_else(|| BackendError::policy(format!("{action} requires an authenticated session")))
    }

    fn announce(&self, kind: ChangeKind) {
        self.shared
            .announce(ChangeEvent::new(kind, self.shared.config.table.clone()));
    }
}

fn rls_violation(table: &str) -> BackendError {
    BackendError::policy(format!(
        "new row violates row-level security policy for table \"{table}\""
    ))
}

#[async_trait]
impl TaskStore for MemoryClient {
    async fn select_all(&self) -> Result<Vec<Task>, BackendError> {
        self.shared.check_fault(Operation::Select)?;
        // Anonymous readers see no rows.
        if self.current_user().is_none() {
            return Ok(Vec::new());
        }
        let mut rows = self.shared.state.lock().rows.clone();
        todo_core::ordering::sort_tasks(&mut rows);
        Ok(rows)
    }

    #[instrument(skip_all, fields(category = %task.category))]
    async fn insert(&self, task: &NewTask) -> Result<Task, BackendError> {
        self.shared.check_fault(Operation::Insert)?;
        let user = self.require_user("insert")?;
        if task.user_id != user.id {
            return Err(rls_violation(&self.shared.config.table));
        }

        let row = Task {
            id: TaskId::generate(),
            content: task.content.clone(),
            completed: task.completed,
            created_at: Utc::now(),
            sort_order: task.sort_order,
            category: task.category,
            user_id: task.user_id.clone(),
        };
        self.shared.state.lock().rows.push(row.clone());
        self.announce(ChangeKind::Insert);
        Ok(row)
    }

    #[instrument(skip_all, fields(task_id = %id))]
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, BackendError> {
        self.shared.check_fault(Operation::Update)?;
        let _user = self.require_user("update")?;

        let row = {
            let mut state = self.shared.state.lock();
            let Some(row) = state.rows.iter_mut().find(|t| &t.id == id) else {
                return Err(BackendError::with_status(406, "JSON object requested, multiple (or no) rows returned")
                    .code("PGRST116"));
            };
            patch.apply_to(row);
            row.clone()
        };
        self.announce(ChangeKind::Update);
        Ok(row)
    }

    #[instrument(skip_all, fields(task_id = %id))]
    async fn delete(&self, id: &TaskId) -> Result<(), BackendError> {
        self.shared.check_fault(Operation::Delete)?;
        let user = self.require_user("delete")?;

        {
            let mut state = self.shared.state.lock();
            let Some(index) = state.rows.iter().position(|t| &t.id == id) else {
                return Ok(());
            };
            if !state.rows[index].can_delete(&user) {
                return Err(BackendError::policy(
                    "only the creator may delete a task, and only while it is incomplete",
                ));
            }
            let _ = state.rows.remove(index);
        }
        self.announce(ChangeKind::Delete);
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for MemoryClient {
    #[instrument(skip(self))]
    async fn subscribe(&self, channel: &str) -> Result<ChangeStream, BackendError> {
        self.shared.check_fault(Operation::Subscribe)?;
        let events = self.shared.changes.subscribe();
        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        self.shared.state.lock().subscriptions += 1;
        let _ = tokio::spawn(forward(
            std::sync::Arc::clone(&self.shared),
            events,
            tx,
            cancel.clone(),
        ));
        debug!(channel, "channel joined");
        Ok(ChangeStream::new(rx, cancel))
    }
}

/// Relay table changes to one subscription until it is torn down.
async fn forward(
    shared: std::sync::Arc<Shared>,
    mut events: broadcast::Receiver<ChangeEvent>,
    tx: mpsc::Sender<ChangeEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            received = events.recv() => received,
        };
        let event = match event {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Any event means "refetch", so one stand-in covers the gap.
                warn!(lagged = n, "subscription lagged");
                ChangeEvent::new(ChangeKind::Update, shared.config.table.clone())
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if tx.send(event).await.is_err() {
            break;
        }
    }
    shared.state.lock().subscriptions -= 1;
    debug!("channel left");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
