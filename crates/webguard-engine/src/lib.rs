//! WebGuard engine library.
//!
//! Wires the storage backends, policy store, session origin cache, origin
//! attribution and interception table into a per-frame guard, plus the
//! bootstrapper and reconciliation loop that keep the durable Rule Set in
//! step with what the page has been observed doing. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod attribution;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod guard;
pub mod intercept;
pub mod management;
pub mod obs;
pub mod policy;
pub mod reconcile;
pub mod scenario;
pub mod session;
pub mod storage;
