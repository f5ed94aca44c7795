//! Two-phase optimistic changes.
//!
//! A change is applied to the local collection before the backend call, then
//! either committed with the backend's answer or compensated. Compensation
//! restores the captured pre-change state where that is exact, and otherwise
//! asks the caller to resynchronize with a full fetch.

use todo_core::{Category, Task, TaskId};

use crate::collection::TaskList;

/// How a failed change was undone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compensation {
    /// The pre-change state was restored locally.
    Restored,
    /// Local state is unreliable; refetch everything.
    Resync,
}

/// A local change with explicit commit and compensation steps.
pub trait OptimisticChange {
    /// State captured by [`apply`](Self::apply) for compensation.
    type Undo;
    /// What the backend returns on success.
    type Confirmed;

    /// Apply the change locally.
    fn apply(&self, tasks: &mut TaskList) -> Self::Undo;

    /// Reconcile with the backend's answer.
    fn commit(&self, tasks: &mut TaskList, confirmed: Self::Confirmed);

    /// Undo the change after the backend rejected it.
    fn compensate(&self, tasks: &mut TaskList, undo: Self::Undo) -> Compensation;
}

/// Flip a task's completion flag.
#[derive(Clone, Debug)]
pub struct FlipCompletion {
    id: TaskId,
}

impl FlipCompletion {
    /// Flip the task with `id`.
    pub fn new(id: TaskId) -> Self {
        Self { id }
    }
}

impl OptimisticChange for FlipCompletion {
    type Undo = Option<bool>;
    type Confirmed = Task;

    fn apply(&self, tasks: &mut TaskList) -> Option<bool> {
        let current = tasks.get(&self.id)?.completed;
        tasks.set_completed(&self.id, !current)
    }

    fn commit(&self, tasks: &mut TaskList, confirmed: Task) {
        tasks.upsert(confirmed);
    }

    fn compensate(&self, tasks: &mut TaskList, undo: Option<bool>) -> Compensation {
        match undo {
            Some(previous) => {
                let _ = tasks.set_completed(&self.id, previous);
                Compensation::Restored
            }
            None => Compensation::Resync,
        }
    }
}

/// Remove a task.
#[derive(Clone, Debug)]
pub struct RemoveTask {
    id: TaskId,
}

impl RemoveTask {
    /// Remove the task with `id`.
    pub fn new(id: TaskId) -> Self {
        Self { id }
    }
}

impl OptimisticChange for RemoveTask {
    type Undo = Option<(usize, Task)>;
    type Confirmed = ();

    fn apply(&self, tasks: &mut TaskList) -> Option<(usize, Task)> {
        tasks.remove(&self.id)
    }

    fn commit(&self, _tasks: &mut TaskList, (): ()) {}

    fn compensate(&self, tasks: &mut TaskList, undo: Option<(usize, Task)>) -> Compensation {
        match undo {
            Some((index, task)) => {
                tasks.restore(index, task);
                Compensation::Restored
            }
            None => Compensation::Resync,
        }
    }
}

/// Replace a category's tasks with a renumbered order.
///
/// Per-task updates may partially succeed, so failure always resynchronizes.
#[derive(Clone, Debug)]
pub struct Renumber {
    category: Category,
    renumbered: Vec<Task>,
}

impl Renumber {
    /// Replace `category` with `renumbered`, already numbered `0..n`.
    pub fn new(category: Category, renumbered: Vec<Task>) -> Self {
        Self {
            category,
            renumbered,
        }
    }
}

impl OptimisticChange for Renumber {
    type Undo = ();
    type Confirmed = ();

    fn apply(&self, tasks: &mut TaskList) {
        tasks.replace_category(self.category, self.renumbered.clone());
    }

    fn commit(&self, _tasks: &mut TaskList, (): ()) {}

    fn compensate(&self, _tasks: &mut TaskList, (): ()) -> Compensation {
        Compensation::Resync
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
