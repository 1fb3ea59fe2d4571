//! webguard core: error taxonomy, Rule Set wire shape, storage key naming and
//! the policy injection codec.
//!
//! This crate defines the contracts shared by every execution context (page
//! frame, extension context, management surface). It carries no runtime
//! dependencies so each context can link it without pulling in an executor.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed URLs, JSON and payloads surface as `GuardError` values so the
//! interception hot path can fail open instead of crashing the host page.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod origin;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorKind, GuardError, Result};
pub use protocol::rules::RuleSet;
