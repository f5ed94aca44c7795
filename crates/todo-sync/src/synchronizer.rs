//! Task collection synchronizer.
//!
//! Keeps a local, ordered copy of the shared task table. Reads replace the
//! collection wholesale. Toggle and delete are optimistic with exact
//! compensation; reorder is optimistic and resynchronizes on any failure.
//! Local changes are applied before the backend call is issued.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use todo_core::ordering::{next_sort_order, plan_move, renumber};
use todo_core::{Category, Identity, IdentitySource, NewTask, Task, TaskId, TaskPatch};
use tracing::{debug, info, instrument, warn};

use crate::collection::{TaskList, TaskSnapshot};
use crate::errors::SyncError;
use crate::optimistic::{Compensation, FlipCompletion, OptimisticChange, RemoveTask, Renumber};
use crate::store::TaskStore;

/// Owns the local task collection for one client.
pub struct TaskSynchronizer {
    store: Arc<dyn TaskStore>,
    identity: Arc<dyn IdentitySource>,
    state: Mutex<TaskSnapshot>,
    published: watch::Sender<TaskSnapshot>,
}

impl TaskSynchronizer {
    /// Create an empty synchronizer in the `loading` state.
    pub fn new(store: Arc<dyn TaskStore>, identity: Arc<dyn IdentitySource>) -> Self {
        let (published, _rx) = watch::channel(TaskSnapshot::default());
        Self {
            store,
            identity,
            state: Mutex::new(TaskSnapshot::default()),
            published,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.state.lock().clone()
    }

    /// Current tasks in collection order.
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.to_vec()
    }

    /// Whether a full fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Message of the most recent failure.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Observe snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.published.subscribe()
    }

    /// Replace the local collection with every task from the backend.
    ///
    /// Without an identity the collection is cleared and an empty list is
    /// returned. On failure the stale collection stays visible.
    #[instrument(skip_all)]
    pub async fn fetch_all(&self) -> Result<Vec<Task>, SyncError> {
        self.load(true).await
    }

    async fn load(&self, clear_error: bool) -> Result<Vec<Task>, SyncError> {
        self.modify(|s| s.loading = true);

        if self.identity.current_identity().is_none() {
            debug!("no identity, clearing tasks");
            self.modify(|s| {
                s.tasks = TaskList::default();
                s.loading = false;
            });
            return Ok(Vec::new());
        }

        match self.store.select_all().await {
            Ok(rows) => {
                let tasks = TaskList::from_rows(rows);
                let out = tasks.to_vec();
                debug!(count = out.len(), "fetched tasks");
                self.modify(|s| {
                    s.tasks = tasks;
                    if clear_error {
                        s.error = None;
                    }
                    s.loading = false;
                });
                Ok(out)
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch tasks");
                self.modify(|s| {
                    s.error = Some(e.message.clone());
                    s.loading = false;
                });
                Err(e.into())
            }
        }
    }

    /// Create a task at the end of `category`.
    ///
    /// `sort_order` is derived from the local collection, not re-queried.
    #[instrument(skip(self, content), fields(category = %category))]
    pub async fn add(&self, content: &str, category: Category) -> Result<Task, SyncError> {
        let result = self.try_add(content, category).await;
        self.settle(&result);
        result
    }

    async fn try_add(&self, content: &str, category: Category) -> Result<Task, SyncError> {
        let identity = self.require_identity()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::InvalidInput("task content is empty".to_string()));
        }

        let sort_order = next_sort_order(self.state.lock().tasks.as_slice(), category);
        let new_task = NewTask {
            content: content.to_string(),
            completed: false,
            sort_order,
            category,
            user_id: identity.id,
        };
        let row = self.store.insert(&new_task).await?;
        info!(task_id = %row.id, sort_order = row.sort_order, "task added");
        self.modify(|s| s.tasks.upsert(row.clone()));
        Ok(row)
    }

    /// Flip a task's completion flag. Only the creator may toggle.
    ///
    /// The flip is visible immediately; on failure it is reverted.
    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn toggle(&self, id: &TaskId) -> Result<(), SyncError> {
        let task = self.find(id)?;
        if let Err(e) = self.authorize_toggle(&task) {
            self.record_failure(&e);
            return Err(e);
        }

        let store = &self.store;
        let patch = TaskPatch::completed(!task.completed);
        self.run_optimistic(&FlipCompletion::new(id.clone()), || async move {
            Ok(store.update(id, &patch).await?)
        })
        .await
    }

    /// Delete a task.
    ///
    /// Requires a signed-in identity. Ownership and completion rules are left
    /// to the backend; a rejected delete puts the task back where it was.
    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn delete(&self, id: &TaskId) -> Result<(), SyncError> {
        let _ = self.authenticate()?;
        let _ = self.find(id)?;
        let store = &self.store;
        self.run_optimistic(&RemoveTask::new(id.clone()), || async move {
            Ok(store.delete(id).await?)
        })
        .await
    }

    /// Rewrite `category` to follow `new_order`, numbering it `0..n`.
    ///
    /// Requires a signed-in identity. Entries of other categories in
    /// `new_order` are ignored. One update is issued per task, concurrently.
    /// If any fails, the collection is refetched.
    #[instrument(skip(self, new_order), fields(category = %category, len = new_order.len()))]
    pub async fn reorder(&self, category: Category, new_order: &[Task]) -> Result<(), SyncError> {
        let _ = self.authenticate()?;
        let renumbered = renumber(category, new_order);
        let updates: Vec<(TaskId, TaskPatch)> = renumbered
            .iter()
            .map(|t| (t.id.clone(), TaskPatch::sort_order(t.sort_order)))
            .collect();

        let store = &self.store;
        self.run_optimistic(&Renumber::new(category, renumbered), || async move {
            let total = updates.len();
            let results = join_all(updates.iter().map(|(id, patch)| store.update(id, patch))).await;
            let mut failures = results.into_iter().filter_map(Result::err);
            match failures.next() {
                None => Ok(()),
                Some(first) => Err(SyncError::Reorder {
                    failed: 1 + failures.count(),
                    total,
                    first,
                }),
            }
        })
        .await
    }

    /// Move `active` to the position of `over` within their shared category.
    ///
    /// Returns `Ok(false)` when the move is a no-op (same task, unknown id,
    /// or different categories).
    pub async fn move_task(&self, active: &TaskId, over: &TaskId) -> Result<bool, SyncError> {
        let plan = plan_move(self.state.lock().tasks.as_slice(), active, over);
        match plan {
            Some((category, order)) => {
                self.reorder(category, &order).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply `change`, issue the backend call, then commit or compensate.
    async fn run_optimistic<C, F, Fut>(&self, change: &C, issue: F) -> Result<(), SyncError>
    where
        C: OptimisticChange,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C::Confirmed, SyncError>>,
    {
        let undo = self.modify(|s| change.apply(&mut s.tasks));
        match issue().await {
            Ok(confirmed) => {
                self.modify(|s| {
                    change.commit(&mut s.tasks, confirmed);
                    s.error = None;
                });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "backend rejected change, compensating");
                let compensation = self.modify(|s| {
                    s.error = Some(e.to_string());
                    change.compensate(&mut s.tasks, undo)
                });
                if compensation == Compensation::Resync {
                    // The failure stays recorded through the resync.
                    let _ = self.load(false).await;
                }
                Err(e)
            }
        }
    }

    fn find(&self, id: &TaskId) -> Result<Task, SyncError> {
        self.state
            .lock()
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(id.clone()))
    }

    fn require_identity(&self) -> Result<Identity, SyncError> {
        self.identity
            .current_identity()
            .ok_or(SyncError::Unauthenticated)
    }

    /// Like [`require_identity`](Self::require_identity), recording the
    /// failure.
    fn authenticate(&self) -> Result<Identity, SyncError> {
        self.require_identity().inspect_err(|e| self.record_failure(e))
    }

    fn authorize_toggle(&self, task: &Task) -> Result<(), SyncError> {
        let identity = self.require_identity()?;
        if task.can_toggle(&identity) {
            Ok(())
        } else {
            Err(SyncError::Unauthorized(
                "you can only toggle your own tasks".to_string(),
            ))
        }
    }

    /// Clear the error on success, record it on failure.
    fn settle<T>(&self, result: &Result<T, SyncError>) {
        match result {
            Ok(_) => self.modify(|s| s.error = None),
            Err(e) => self.record_failure(e),
        }
    }

    fn record_failure(&self, e: &SyncError) {
        if matches!(e, SyncError::NotFound(_)) {
            return;
        }
        warn!(error = %e, "task operation failed");
        self.modify(|s| s.error = Some(e.to_string()));
    }

    /// Mutate the snapshot and publish the result.
    fn modify<R>(&self, f: impl FnOnce(&mut TaskSnapshot) -> R) -> R {
        let mut state = self.state.lock();
        let out = f(&mut state);
        let _ = self.published.send_replace(state.clone());
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockStore, Op, identity, task};
    use assert_matches::assert_matches;
    use todo_core::{StaticIdentity, UserId};

    fn signed_in(store: &Arc<MockStore>, user: &str) -> Arc<TaskSynchronizer> {
        Arc::new(TaskSynchronizer::new(
            Arc::clone(store) as Arc<dyn TaskStore>,
            Arc::new(StaticIdentity(Some(identity(user)))),
        ))
    }

    fn project_a(owner: &str) -> Arc<MockStore> {
        MockStore::with_rows(vec![
            task("a", Category::ProjectA, 0, owner),
            task("b", Category::ProjectA, 1, owner),
            task("c", Category::ProjectA, 2, owner),
        ])
    }

    fn ids(sync: &TaskSynchronizer) -> Vec<String> {
        sync.tasks().into_iter().map(|t| t.id.into_inner()).collect()
    }

    fn order_of(sync: &TaskSynchronizer, id: &str) -> i64 {
        sync.tasks()
            .into_iter()
            .find(|t| t.id.as_str() == id)
            .map(|t| t.sort_order)
            .unwrap()
    }

    // ── fetch_all ──

    #[tokio::test]
    async fn starts_loading() {
        let sync = signed_in(&project_a("u1"), "u1");
        assert!(sync.is_loading());
        assert!(sync.tasks().is_empty());
    }

    #[tokio::test]
    async fn fetch_without_identity_clears() {
        let store = project_a("u1");
        let sync = TaskSynchronizer::new(store.clone(), Arc::new(StaticIdentity(None)));
        let fetched = sync.fetch_all().await.unwrap();
        assert!(fetched.is_empty());
        assert!(!sync.is_loading());
        assert_eq!(store.count(Op::Select), 0);
    }

    #[tokio::test]
    async fn fetch_replaces_collection_in_order() {
        let store = MockStore::with_rows(vec![
            task("x", Category::ProjectB, 0, "u1"),
            task("b", Category::ProjectA, 1, "u1"),
            task("a", Category::ProjectA, 0, "u2"),
        ]);
        let sync = signed_in(&store, "u1");
        let fetched = sync.fetch_all().await.unwrap();
        assert_eq!(fetched.len(), 3);
        assert_eq!(ids(&sync), vec!["a", "b", "x"]);
        assert!(!sync.is_loading());
        assert!(sync.error().is_none());
    }

    #[tokio::test]
    async fn fetch_failure_keeps_stale_tasks() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        store.fail_next(Op::Select, "network down");
        let err = sync.fetch_all().await.unwrap_err();
        assert_matches!(err, SyncError::Backend(_));
        assert_eq!(ids(&sync), vec!["a", "b", "c"]);
        assert_eq!(sync.error().as_deref(), Some("network down"));
        assert!(!sync.is_loading());

        let _ = sync.fetch_all().await.unwrap();
        assert!(sync.error().is_none());
    }

    // ── add ──

    #[tokio::test]
    async fn add_to_empty_category_starts_at_zero() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        let created = sync.add("Buy milk", Category::ProjectB).await.unwrap();
        assert_eq!(created.sort_order, 0);
        assert_eq!(created.category, Category::ProjectB);
        assert!(!created.completed);
        assert_eq!(created.user_id, UserId::from("u1"));
        assert_eq!(sync.tasks().last(), Some(&created));
    }

    #[tokio::test]
    async fn add_goes_after_existing_maximum() {
        let store = MockStore::with_rows(vec![
            task("a", Category::ProjectA, 0, "u2"),
            task("b", Category::ProjectA, 5, "u2"),
        ]);
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        let created = sync.add("  write report  ", Category::ProjectA).await.unwrap();
        assert_eq!(created.content, "write report");
        assert_eq!(created.sort_order, 6);

        let fetched = sync.fetch_all().await.unwrap();
        let new_row = fetched.iter().find(|t| t.id == created.id).unwrap();
        assert!(
            fetched
                .iter()
                .filter(|t| t.category == Category::ProjectA && t.id != created.id)
                .all(|t| t.sort_order < new_row.sort_order)
        );
    }

    #[tokio::test]
    async fn add_requires_identity() {
        let store = project_a("u1");
        let sync = TaskSynchronizer::new(store.clone(), Arc::new(StaticIdentity(None)));
        let err = sync.add("x", Category::ProjectA).await.unwrap_err();
        assert_matches!(err, SyncError::Unauthenticated);
        assert_eq!(store.count(Op::Insert), 0);
        assert_eq!(sync.error().as_deref(), Some("please sign in first"));
    }

    #[tokio::test]
    async fn add_rejects_blank_content() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let err = sync.add("   ", Category::ProjectA).await.unwrap_err();
        assert_matches!(err, SyncError::InvalidInput(_));
        assert_eq!(store.count(Op::Insert), 0);
    }

    #[tokio::test]
    async fn add_failure_is_recorded_and_returned() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();
        store.fail_next(Op::Insert, "insert rejected");

        let err = sync.add("x", Category::ProjectA).await.unwrap_err();
        assert_eq!(err.to_string(), "insert rejected");
        assert_eq!(sync.error().as_deref(), Some("insert rejected"));
        assert_eq!(sync.tasks().len(), 3);
    }

    // ── toggle ──

    #[tokio::test]
    async fn toggle_of_foreign_task_is_refused() {
        let store = project_a("owner-a");
        let sync = signed_in(&store, "user-b");
        let _ = sync.fetch_all().await.unwrap();

        let err = sync.toggle(&TaskId::from("b")).await.unwrap_err();
        assert_matches!(err, SyncError::Unauthorized(_));
        assert!(!sync.tasks()[1].completed);
        assert_eq!(sync.error().as_deref(), Some("you can only toggle your own tasks"));
        assert_eq!(store.count(Op::Update), 0);
    }

    #[tokio::test]
    async fn toggle_commits_backend_row() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();
        store.rows.lock()[1].content = "edited elsewhere".to_string();

        sync.toggle(&TaskId::from("b")).await.unwrap();
        let local = sync.tasks().into_iter().find(|t| t.id.as_str() == "b").unwrap();
        assert_eq!(Some(local), store.row("b"));
        assert!(store.row("b").unwrap().completed);
    }

    #[tokio::test]
    async fn toggle_flip_is_visible_before_response() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();
        let gate = store.gate_writes();

        let pending = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.toggle(&TaskId::from("a")).await }
        });
        let mut rx = sync.subscribe();
        let _ = rx
            .wait_for(|s| s.tasks.get(&TaskId::from("a")).is_some_and(|t| t.completed))
            .await
            .unwrap();
        assert!(!store.row("a").unwrap().completed);

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert!(store.row("a").unwrap().completed);
    }

    #[tokio::test]
    async fn toggle_failure_reverts_flip() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();
        store.fail_next(Op::Update, "permission denied");

        let before = sync.tasks();
        let err = sync.toggle(&TaskId::from("c")).await.unwrap_err();
        assert_matches!(err, SyncError::Backend(_));
        assert_eq!(sync.tasks(), before);
        assert_eq!(sync.error().as_deref(), Some("permission denied"));
    }

    #[tokio::test]
    async fn toggle_of_unknown_task_does_nothing() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        let err = sync.toggle(&TaskId::from("nope")).await.unwrap_err();
        assert_matches!(err, SyncError::NotFound(_));
        assert!(sync.error().is_none());
        assert_eq!(store.count(Op::Update), 0);
    }

    // ── delete ──

    #[tokio::test]
    async fn delete_removes_task() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        sync.delete(&TaskId::from("b")).await.unwrap();
        assert_eq!(ids(&sync), vec!["a", "c"]);
        assert!(store.row("b").is_none());
    }

    #[tokio::test]
    async fn delete_failure_restores_exact_record() {
        let store = project_a("owner-a");
        let sync = signed_in(&store, "user-b");
        let _ = sync.fetch_all().await.unwrap();
        store.fail_next(Op::Delete, "policy violation");

        let before = sync.tasks();
        let err = sync.delete(&TaskId::from("b")).await.unwrap_err();
        assert_eq!(err.to_string(), "policy violation");
        assert_eq!(sync.tasks(), before);
        assert_eq!(sync.error().as_deref(), Some("policy violation"));
    }

    #[tokio::test]
    async fn delete_failure_keeps_place_among_equal_sort_orders() {
        let store = MockStore::with_rows(vec![
            task("a", Category::ProjectA, 0, "u1"),
            task("b", Category::ProjectA, 0, "u2"),
            task("c", Category::ProjectA, 1, "u1"),
        ]);
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();
        assert_eq!(ids(&sync), vec!["a", "b", "c"]);
        store.fail_next(Op::Delete, "delete rejected");

        let _ = sync.delete(&TaskId::from("a")).await.unwrap_err();
        assert_eq!(ids(&sync), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn delete_requires_identity() {
        let store = project_a("u1");
        let sync = TaskSynchronizer::new(store.clone(), Arc::new(StaticIdentity(None)));
        let err = sync.delete(&TaskId::from("a")).await.unwrap_err();
        assert_matches!(err, SyncError::Unauthenticated);
        assert_eq!(store.count(Op::Delete), 0);
        assert_eq!(sync.error().as_deref(), Some("please sign in first"));
    }

    #[tokio::test]
    async fn delete_removal_is_visible_before_response() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();
        let gate = store.gate_writes();

        let pending = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.delete(&TaskId::from("c")).await }
        });
        let mut rx = sync.subscribe();
        let _ = rx.wait_for(|s| s.tasks.len() == 2).await.unwrap();
        assert!(store.row("c").is_some());

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert!(store.row("c").is_none());
    }

    #[tokio::test]
    async fn delete_of_unknown_task_does_nothing() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let err = sync.delete(&TaskId::from("a")).await.unwrap_err();
        assert_matches!(err, SyncError::NotFound(_));
        assert_eq!(store.count(Op::Delete), 0);
    }

    // ── reorder ──

    #[tokio::test]
    async fn reorder_moves_last_to_first() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let tasks = sync.fetch_all().await.unwrap();

        let new_order = vec![tasks[2].clone(), tasks[0].clone(), tasks[1].clone()];
        sync.reorder(Category::ProjectA, &new_order).await.unwrap();

        assert_eq!(ids(&sync), vec!["c", "a", "b"]);
        assert_eq!(order_of(&sync, "c"), 0);
        assert_eq!(order_of(&sync, "a"), 1);
        assert_eq!(order_of(&sync, "b"), 2);
        assert_eq!(store.row("c").unwrap().sort_order, 0);
        assert_eq!(store.row("b").unwrap().sort_order, 2);
        assert_eq!(store.count(Op::Update), 3);
    }

    #[tokio::test]
    async fn reorder_requires_identity() {
        let store = project_a("u1");
        let sync = TaskSynchronizer::new(store.clone(), Arc::new(StaticIdentity(None)));
        let new_order = vec![
            task("b", Category::ProjectA, 1, "u1"),
            task("a", Category::ProjectA, 0, "u1"),
        ];

        let err = sync.reorder(Category::ProjectA, &new_order).await.unwrap_err();
        assert_matches!(err, SyncError::Unauthenticated);
        assert_eq!(store.count(Op::Update), 0);
        assert!(sync.tasks().is_empty());
        assert_eq!(sync.error().as_deref(), Some("please sign in first"));
        assert_eq!(store.row("a").unwrap().sort_order, 0);
    }

    #[tokio::test]
    async fn reorder_ignores_other_categories() {
        let store = MockStore::with_rows(vec![
            task("a", Category::ProjectA, 0, "u1"),
            task("b", Category::ProjectA, 1, "u1"),
            task("x", Category::ProjectC, 4, "u1"),
        ]);
        let sync = signed_in(&store, "u1");
        let tasks = sync.fetch_all().await.unwrap();

        let mixed = vec![tasks[2].clone(), tasks[1].clone(), tasks[0].clone()];
        sync.reorder(Category::ProjectA, &mixed).await.unwrap();
        assert_eq!(order_of(&sync, "b"), 0);
        assert_eq!(order_of(&sync, "a"), 1);
        assert_eq!(order_of(&sync, "x"), 4);
        assert_eq!(store.count(Op::Update), 2);
    }

    #[tokio::test]
    async fn reorder_partial_failure_resyncs() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let tasks = sync.fetch_all().await.unwrap();
        store.fail_updates_of("a");

        let new_order = vec![tasks[2].clone(), tasks[0].clone(), tasks[1].clone()];
        let err = sync.reorder(Category::ProjectA, &new_order).await.unwrap_err();
        assert_matches!(err, SyncError::Reorder { failed: 1, total: 3, .. });

        // Local state is whatever the backend holds after the partial batch.
        let backend: Vec<(String, i64)> = {
            let mut rows = store.rows.lock().clone();
            todo_core::ordering::sort_tasks(&mut rows);
            rows.into_iter().map(|t| (t.id.into_inner(), t.sort_order)).collect()
        };
        let local: Vec<(String, i64)> = sync
            .tasks()
            .into_iter()
            .map(|t| (t.id.into_inner(), t.sort_order))
            .collect();
        assert_eq!(local, backend);
        assert_eq!(store.count(Op::Select), 2);
        assert!(sync.error().unwrap().starts_with("reorder failed for 1 of 3 tasks"));
    }

    // ── move_task ──

    #[tokio::test]
    async fn move_task_reorders_category() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        let moved = sync
            .move_task(&TaskId::from("a"), &TaskId::from("c"))
            .await
            .unwrap();
        assert!(moved);
        assert_eq!(ids(&sync), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn move_task_no_op_cases() {
        let store = MockStore::with_rows(vec![
            task("a", Category::ProjectA, 0, "u1"),
            task("x", Category::ProjectB, 0, "u1"),
        ]);
        let sync = signed_in(&store, "u1");
        let _ = sync.fetch_all().await.unwrap();

        let a = TaskId::from("a");
        assert!(!sync.move_task(&a, &a).await.unwrap());
        assert!(!sync.move_task(&a, &TaskId::from("x")).await.unwrap());
        assert!(!sync.move_task(&a, &TaskId::from("missing")).await.unwrap());
        assert_eq!(store.count(Op::Update), 0);
    }

    // ── observation ──

    #[tokio::test]
    async fn subscribers_see_fetch_results() {
        let store = project_a("u1");
        let sync = signed_in(&store, "u1");
        let mut rx = sync.subscribe();
        let _ = sync.fetch_all().await.unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.by_category()[&Category::ProjectA].len(), 3);
        assert!(snapshot.by_category()[&Category::ProjectB].is_empty());
    }
}
