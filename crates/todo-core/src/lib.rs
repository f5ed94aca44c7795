//! # todo-core
//!
//! Shared vocabulary for the shared to-do list crates:
//!
//! - **Branded IDs**: [`TaskId`], [`UserId`]
//! - **Rows**: [`Task`], insert payload [`NewTask`], partial update [`TaskPatch`]
//! - **Categories**: the closed [`Category`] enumeration
//! - **Ordering**: `(category, sort_order)` rules, renumbering and drag planning
//! - **Identity**: [`Identity`] and the [`IdentitySource`] seam
//! - **Errors**: [`BackendError`], the failure shape of every backend call
//! - **Logging**: subscriber init and test capture

#![deny(unsafe_code)]

pub mod errors;
pub mod identity;
pub mod ids;
pub mod logging;
pub mod ordering;
pub mod task;

pub use errors::BackendError;
pub use identity::{Identity, IdentitySource, StaticIdentity};
pub use ids::{TaskId, UserId};
pub use task::{Category, NewTask, Task, TaskPatch, UnknownCategory};
