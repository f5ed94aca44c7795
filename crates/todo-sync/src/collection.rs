//! Local task collection and the snapshot observers see.

use std::collections::BTreeMap;

use todo_core::ordering::{group_by_category, sort_tasks, splice_category};
use todo_core::{Category, Task, TaskId};

/// Tasks ordered by `(category, sort_order)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskList(Vec<Task>);

impl TaskList {
    /// Build from backend rows, sorting them into collection order.
    pub fn from_rows(mut rows: Vec<Task>) -> Self {
        sort_tasks(&mut rows);
        Self(rows)
    }

    /// Tasks in collection order.
    pub fn as_slice(&self) -> &[Task] {
        &self.0
    }

    /// Owned copy of the tasks.
    pub fn to_vec(&self) -> Vec<Task> {
        self.0.clone()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.0.iter()
    }

    /// Task by id.
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.0.iter().find(|t| &t.id == id)
    }

    /// Insert `task`, or replace the row with the same id, keeping order.
    pub fn upsert(&mut self, task: Task) {
        match self.0.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.0.push(task),
        }
        sort_tasks(&mut self.0);
    }

    /// Set the completion flag, returning the previous value.
    pub fn set_completed(&mut self, id: &TaskId, completed: bool) -> Option<bool> {
        let task = self.0.iter_mut().find(|t| &t.id == id)?;
        Some(std::mem::replace(&mut task.completed, completed))
    }

    /// Remove the task with `id`, returning it with the index it held.
    pub fn remove(&mut self, id: &TaskId) -> Option<(usize, Task)> {
        let index = self.0.iter().position(|t| &t.id == id)?;
        Some((index, self.0.remove(index)))
    }

    /// Put a removed task back at `index`, clamped to the current length.
    ///
    /// Tasks that share its `sort_order` keep their position relative to it.
    pub fn restore(&mut self, index: usize, task: Task) {
        let index = index.min(self.0.len());
        self.0.insert(index, task);
        sort_tasks(&mut self.0);
    }

    /// Replace the tasks of `category` with `renumbered`, already numbered
    /// in display order.
    pub fn replace_category(&mut self, category: Category, renumbered: Vec<Task>) {
        self.0 = splice_category(&self.0, category, renumbered);
    }

    /// Tasks grouped per category for display.
    pub fn by_category(&self) -> BTreeMap<Category, Vec<Task>> {
        group_by_category(&self.0)
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Observable synchronizer state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Current local collection.
    pub tasks: TaskList,
    /// A full fetch is in flight.
    pub loading: bool,
    /// Message of the most recent failure, cleared by the next success.
    pub error: Option<String>,
}

impl Default for TaskSnapshot {
    fn default() -> Self {
        Self {
            tasks: TaskList::default(),
            loading: true,
            error: None,
        }
    }
}

impl TaskSnapshot {
    /// Tasks grouped per category for display.
    pub fn by_category(&self) -> BTreeMap<Category, Vec<Task>> {
        self.tasks.by_category()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use todo_core::UserId;

    fn task(id: &str, category: Category, sort_order: i64) -> Task {
        Task {
            id: TaskId::from(id),
            content: format!("task {id}"),
            completed: false,
            created_at: Utc::now(),
            sort_order,
            category,
            user_id: UserId::from("u1"),
        }
    }

    fn ids(list: &TaskList) -> Vec<&str> {
        list.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn from_rows_sorts() {
        let list = TaskList::from_rows(vec![
            task("c", Category::ProjectB, 0),
            task("b", Category::ProjectA, 1),
            task("a", Category::ProjectA, 0),
        ]);
        assert_eq!(ids(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut list = TaskList::from_rows(vec![task("a", Category::ProjectA, 0)]);
        let mut updated = task("a", Category::ProjectA, 0);
        updated.completed = true;
        list.upsert(updated);
        assert_eq!(list.len(), 1);
        assert!(list.get(&TaskId::from("a")).unwrap().completed);

        list.upsert(task("b", Category::ProjectA, 1));
        assert_eq!(ids(&list), vec!["a", "b"]);
    }

    #[test]
    fn set_completed_returns_previous() {
        let mut list = TaskList::from_rows(vec![task("a", Category::ProjectA, 0)]);
        assert_eq!(list.set_completed(&TaskId::from("a"), true), Some(false));
        assert_eq!(list.set_completed(&TaskId::from("a"), false), Some(true));
        assert_eq!(list.set_completed(&TaskId::from("zz"), true), None);
    }

    #[test]
    fn remove_then_restore_keeps_position() {
        let mut list = TaskList::from_rows(vec![
            task("a", Category::ProjectA, 0),
            task("b", Category::ProjectA, 1),
            task("c", Category::ProjectA, 2),
        ]);
        let (index, removed) = list.remove(&TaskId::from("b")).unwrap();
        assert_eq!(index, 1);
        assert_eq!(ids(&list), vec!["a", "c"]);
        list.restore(index, removed);
        assert_eq!(ids(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn restore_keeps_place_among_equal_sort_orders() {
        let mut list = TaskList::from_rows(vec![
            task("a", Category::ProjectA, 0),
            task("b", Category::ProjectA, 0),
            task("c", Category::ProjectA, 1),
        ]);
        let (index, removed) = list.remove(&TaskId::from("a")).unwrap();
        list.restore(index, removed);
        assert_eq!(ids(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn restore_clamps_past_end() {
        let mut list = TaskList::from_rows(vec![task("a", Category::ProjectA, 0)]);
        list.restore(9, task("b", Category::ProjectA, 1));
        assert_eq!(ids(&list), vec!["a", "b"]);
    }

    #[test]
    fn replace_category_touches_only_category() {
        let mut list = TaskList::from_rows(vec![
            task("a", Category::ProjectA, 0),
            task("b", Category::ProjectA, 1),
            task("x", Category::ProjectB, 7),
        ]);
        let order = vec![task("b", Category::ProjectA, 0), task("a", Category::ProjectA, 1)];
        list.replace_category(Category::ProjectA, order);
        assert_eq!(ids(&list), vec!["b", "a", "x"]);
        assert_eq!(list.get(&TaskId::from("b")).unwrap().sort_order, 0);
        assert_eq!(list.get(&TaskId::from("x")).unwrap().sort_order, 7);
    }

    #[test]
    fn snapshot_starts_loading() {
        let snapshot = TaskSnapshot::default();
        assert!(snapshot.loading);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.by_category().len(), 3);
    }
}
