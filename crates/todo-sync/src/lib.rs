//! # todo-sync
//!
//! Client-side synchronization of the shared task table.
//!
//! - [`TaskStore`] / [`ChangeFeed`]: contracts for the data service and its
//!   push channel
//! - [`TaskSynchronizer`]: local ordered collection with optimistic toggle,
//!   delete and reorder
//! - [`LiveUpdates`]: refetch-on-change loop bound to a channel subscription
//!
//! The synchronizer reads the signed-in identity through
//! [`todo_core::IdentitySource`].

#![deny(unsafe_code)]

pub mod collection;
pub mod errors;
pub mod feed;
pub mod live;
pub mod optimistic;
pub mod store;
pub mod synchronizer;

#[cfg(test)]
mod testing;

pub use collection::{TaskList, TaskSnapshot};
pub use errors::SyncError;
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream};
pub use live::LiveUpdates;
pub use optimistic::{Compensation, OptimisticChange};
pub use store::TaskStore;
pub use synchronizer::TaskSynchronizer;
