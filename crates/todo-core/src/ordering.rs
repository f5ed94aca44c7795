//! Display-order rules for task collections.
//!
//! A collection is ordered by `(category, sort_order)`. Within a category,
//! `sort_order` after a reorder is the contiguous sequence `0..n` matching
//! display order. New tasks go one past the current maximum.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ids::TaskId;
use crate::task::{Category, Task};

/// Collection order: category first, then `sort_order`.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.category
        .cmp(&b.category)
        .then(a.sort_order.cmp(&b.sort_order))
}

/// Stable sort by [`compare_tasks`].
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// `sort_order` for a task appended to `category`: max + 1, or 0 when empty.
pub fn next_sort_order(tasks: &[Task], category: Category) -> i64 {
    tasks
        .iter()
        .filter(|t| t.category == category)
        .map(|t| t.sort_order)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Keep only `category` entries of `order`, numbering them by position.
///
/// Entries from other categories are ignored, so a mixed list is tolerated.
pub fn renumber(category: Category, order: &[Task]) -> Vec<Task> {
    order
        .iter()
        .filter(|t| t.category == category)
        .zip(0_i64..)
        .map(|(task, index)| Task {
            sort_order: index,
            ..task.clone()
        })
        .collect()
}

/// Replace every `category` task in `tasks` with `renumbered`, then re-sort.
///
/// Tasks of other categories are untouched. Local `category` tasks that are
/// absent from `renumbered` are dropped; the next fetch restores them.
pub fn splice_category(tasks: &[Task], category: Category, renumbered: Vec<Task>) -> Vec<Task> {
    let mut merged: Vec<Task> = tasks
        .iter()
        .filter(|t| t.category != category)
        .cloned()
        .chain(renumbered)
        .collect();
    sort_tasks(&mut merged);
    merged
}

/// Move the element at `from` to `to`, shifting the ones in between.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() || to >= items.len() || from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Resolve a drag of `active` onto `over` into a reorder request.
///
/// Returns `None` when the drop is a no-op: same id, unknown id, or tasks in
/// different categories. Otherwise returns the category and its tasks in the
/// new display order.
pub fn plan_move(tasks: &[Task], active: &TaskId, over: &TaskId) -> Option<(Category, Vec<Task>)> {
    if active == over {
        return None;
    }
    let active_task = tasks.iter().find(|t| &t.id == active)?;
    let over_task = tasks.iter().find(|t| &t.id == over)?;
    if active_task.category != over_task.category {
        return None;
    }
    let category = active_task.category;

    let mut in_category: Vec<Task> = tasks
        .iter()
        .filter(|t| t.category == category)
        .cloned()
        .collect();
    in_category.sort_by_key(|t| t.sort_order);

    let from = in_category.iter().position(|t| &t.id == active)?;
    let to = in_category.iter().position(|t| &t.id == over)?;
    array_move(&mut in_category, from, to);
    Some((category, in_category))
}

/// Group tasks per category, each ascending by `sort_order`.
///
/// All three categories are present, possibly empty.
pub fn group_by_category(tasks: &[Task]) -> BTreeMap<Category, Vec<Task>> {
    let mut groups: BTreeMap<Category, Vec<Task>> =
        Category::ALL.into_iter().map(|c| (c, Vec::new())).collect();
    for task in tasks {
        groups.entry(task.category).or_default().push(task.clone());
    }
    for group in groups.values_mut() {
        group.sort_by_key(|t| t.sort_order);
    }
    groups
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
