//! # todo-auth
//!
//! Session state for the shared to-do list client.
//!
//! - [`AuthService`]: contract for the hosted auth service
//! - [`SessionManager`]: owns the current session, applies session-change
//!   notifications, and exposes sign-up/in/out and confirmation resend
//!
//! The manager implements [`todo_core::IdentitySource`], which is how the
//! task synchronizer learns who is signed in.

#![deny(unsafe_code)]

pub mod errors;
pub mod manager;
pub mod service;
pub mod types;

pub use errors::AuthError;
pub use manager::SessionManager;
pub use service::AuthService;
pub use types::{
    AuthChangeEvent, ResendKind, Session, SessionChange, SessionState, SessionStatus,
    SignUpOutcome,
};
