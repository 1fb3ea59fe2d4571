//! Policy layer (Rule Set store and block/allow decision).
//!
//! The store is the durable source of truth shared by every context; the
//! decision is a pure lookup against an in-memory snapshot of it.

pub mod decision;
pub mod store;

pub use decision::{decide, is_origin_blocked, Verdict};
pub use store::PolicyStore;
