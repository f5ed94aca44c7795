//! # todo-backend
//!
//! Concrete collaborators for the session manager and the task synchronizer.
//!
//! - [`MemoryBackend`]: the whole service in-process, with the table's access
//!   policy, for tests and offline demos
//! - [`RestBackend`]: client for the hosted auth, data and realtime service
//!
//! Both implement [`todo_auth::AuthService`], [`todo_sync::TaskStore`] and
//! [`todo_sync::ChangeFeed`].

#![deny(unsafe_code)]

pub mod memory;
pub mod rest;

pub use memory::{MemoryBackend, MemoryClient, MemoryConfig, Operation};
pub use rest::{RestBackend, RestConfig};
