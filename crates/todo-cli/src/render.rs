//! Plain-text rendering of the task list.

use std::fmt::Write as _;

use todo_core::{Identity, Task};
use todo_sync::TaskSnapshot;

/// Render every category with its tasks in display order.
///
/// Tasks created by `viewer` are marked with `*`. A recorded error is
/// printed after the list.
pub fn render_snapshot(snapshot: &TaskSnapshot, viewer: Option<&Identity>) -> String {
    let mut out = String::new();
    for (category, tasks) in snapshot.by_category() {
        let _ = writeln!(out, "{category} ({})", tasks.len());
        for task in &tasks {
            let _ = writeln!(out, "  {}", render_task(task, viewer));
        }
    }
    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "error: {error}");
    }
    out
}

/// One line per task: completion box, position, content, owner mark, id.
pub fn render_task(task: &Task, viewer: Option<&Identity>) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    let mine = if viewer.is_some_and(|v| task.is_owned_by(&v.id)) {
        " *"
    } else {
        ""
    };
    format!(
        "[{mark}] {:>3}  {}{mine}  ({})",
        task.sort_order, task.content, task.id
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
