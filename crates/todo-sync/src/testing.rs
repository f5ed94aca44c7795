//! Test doubles shared by the synchronizer tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use todo_core::{BackendError, Category, Identity, NewTask, Task, TaskId, TaskPatch, UserId};

use crate::feed::{ChangeEvent, ChangeFeed, ChangeStream};
use crate::store::TaskStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Select,
    Insert,
    Update,
    Delete,
}

/// In-memory task table with fault injection and an optional write gate.
#[derive(Default)]
pub(crate) struct MockStore {
    pub(crate) rows: Mutex<Vec<Task>>,
    fail_next: Mutex<HashMap<Op, BackendError>>,
    fail_ids: Mutex<HashSet<TaskId>>,
    gate: Mutex<Option<Arc<Notify>>>,
    pub(crate) calls: Mutex<Vec<Op>>,
}

impl MockStore {
    pub(crate) fn with_rows(rows: Vec<Task>) -> Arc<Self> {
        let store = Self::default();
        *store.rows.lock() = rows;
        Arc::new(store)
    }

    pub(crate) fn fail_next(&self, op: Op, message: &str) {
        let _ = self
            .fail_next
            .lock()
            .insert(op, BackendError::with_status(400, message));
    }

    /// Updates of `id` fail until cleared.
    pub(crate) fn fail_updates_of(&self, id: &str) {
        let _ = self.fail_ids.lock().insert(TaskId::from(id));
    }

    /// Block updates and deletes until the returned handle is notified.
    pub(crate) fn gate_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    pub(crate) fn row(&self, id: &str) -> Option<Task> {
        self.rows.lock().iter().find(|t| t.id.as_str() == id).cloned()
    }

    fn begin(&self, op: Op) -> Result<(), BackendError> {
        self.calls.lock().push(op);
        match self.fail_next.lock().remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl TaskStore for MockStore {
    async fn select_all(&self) -> Result<Vec<Task>, BackendError> {
        self.begin(Op::Select)?;
        let mut rows = self.rows.lock().clone();
        todo_core::ordering::sort_tasks(&mut rows);
        Ok(rows)
    }

    async fn insert(&self, task: &NewTask) -> Result<Task, BackendError> {
        self.begin(Op::Insert)?;
        let row = Task {
            id: TaskId::generate(),
            content: task.content.clone(),
            completed: task.completed,
            created_at: Utc::now(),
            sort_order: task.sort_order,
            category: task.category,
            user_id: task.user_id.clone(),
        };
        self.rows.lock().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, BackendError> {
        self.begin(Op::Update)?;
        self.wait_gate().await;
        if self.fail_ids.lock().contains(id) {
            return Err(BackendError::with_status(500, format!("update of {id} failed")));
        }
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| BackendError::with_status(404, "row not found"))?;
        patch.apply_to(row);
        Ok(row.clone())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), BackendError> {
        self.begin(Op::Delete)?;
        self.wait_gate().await;
        self.rows.lock().retain(|t| &t.id != id);
        Ok(())
    }
}

/// Push channel driven by the test.
#[derive(Default)]
pub(crate) struct MockFeed {
    sender: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
    pub(crate) cancel: Mutex<Option<CancellationToken>>,
    pub(crate) channels: Mutex<Vec<String>>,
    pub(crate) refuse: Mutex<Option<BackendError>>,
}

impl MockFeed {
    pub(crate) async fn emit(&self, event: ChangeEvent) {
        let sender = self.sender.lock().clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    pub(crate) fn cancel_token(&self) -> Option<CancellationToken> {
        self.cancel.lock().clone()
    }
}

#[async_trait]
impl ChangeFeed for MockFeed {
    async fn subscribe(&self, channel: &str) -> Result<ChangeStream, BackendError> {
        if let Some(err) = self.refuse.lock().take() {
            return Err(err);
        }
        self.channels.lock().push(channel.to_string());
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        *self.sender.lock() = Some(tx);
        *self.cancel.lock() = Some(cancel.clone());
        Ok(ChangeStream::new(rx, cancel))
    }
}

pub(crate) fn identity(user: &str) -> Identity {
    Identity {
        id: UserId::from(user),
        email: format!("{user}@example.com"),
        email_confirmed_at: Some(Utc::now()),
    }
}

pub(crate) fn task(id: &str, category: Category, sort_order: i64, owner: &str) -> Task {
    Task {
        id: TaskId::from(id),
        content: format!("task {id}"),
        completed: false,
        created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        sort_order,
        category,
        user_id: UserId::from(owner),
    }
}
