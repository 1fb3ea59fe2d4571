//! Data contracts shared across execution contexts.
//!
//! - Rule Set: the JSON document stored under `rules:<topOrigin>`.
//! - Keys: sentinel and data key naming for the durable and volatile stores.
//! - Injection: the base64 JSON payload pushed into the guard sandbox.
//!
//! Decoders never panic: malformed input is reported as `GuardError::Parse`.

pub mod injection;
pub mod keys;
pub mod rules;
