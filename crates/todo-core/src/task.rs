//! Task row and category types.
//!
//! Field names match the backend table columns (snake case). Category labels
//! are the stored wire values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::ids::{TaskId, UserId};

/// One of the three fixed task groupings, each with independent ordering.
///
/// Variant order matches the lexical order of the stored labels, so the
/// derived `Ord` agrees with the backend's `ORDER BY category`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// `專案A`
    #[serde(rename = "專案A")]
    ProjectA,
    /// `專案B`
    #[serde(rename = "專案B")]
    ProjectB,
    /// `專案C`
    #[serde(rename = "專案C")]
    ProjectC,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Self::ProjectA, Self::ProjectB, Self::ProjectC];

    /// Stored label for this category.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ProjectA => "專案A",
            Self::ProjectB => "專案B",
            Self::ProjectC => "專案C",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string is not one of the category labels.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == trimmed)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A persisted task row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Backend-assigned, immutable.
    pub id: TaskId,
    /// Free-text description, immutable after creation.
    pub content: String,
    /// Completion flag.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Position within the category (ascending).
    pub sort_order: i64,
    /// Grouping, immutable after creation.
    pub category: Category,
    /// Creator; the only identity allowed to toggle or delete.
    pub user_id: UserId,
}

impl Task {
    /// Whether `user` created this task.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    /// Only the creator may toggle completion.
    #[must_use]
    pub fn can_toggle(&self, identity: &Identity) -> bool {
        self.is_owned_by(&identity.id)
    }

    /// Only the creator may delete, and only while the task is incomplete.
    #[must_use]
    pub fn can_delete(&self, identity: &Identity) -> bool {
        !self.completed && self.is_owned_by(&identity.id)
    }
}

/// Insert payload. The backend fills in `id` and `created_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Trimmed, non-empty content.
    pub content: String,
    /// Always `false` on insert.
    pub completed: bool,
    /// One past the current maximum in the category.
    pub sort_order: i64,
    /// Target category.
    pub category: Category,
    /// Creating identity.
    pub user_id: UserId,
}

/// Partial update applied by `update(patch).eq("id", ..)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New completion flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New position within the category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl TaskPatch {
    /// Patch that sets `completed`.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Patch that sets `sort_order`.
    #[must_use]
    pub fn sort_order(sort_order: i64) -> Self {
        Self {
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }

    /// Apply the patch to a row in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(sort_order) = self.sort_order {
            task.sort_order = sort_order;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
