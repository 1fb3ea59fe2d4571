//! Storage key naming.
//!
//! Durable keys are namespaced per top origin; volatile keys are fixed because
//! the volatile store is already scoped to one browsing session of one origin.

/// Value written to a sentinel key while the lock is held.
pub const MUTEX_VALUE: &str = "1";

/// Volatile sentinel key.
pub const SESSION_MUTEX_KEY: &str = "MyWebGuard_Mutex";

/// Volatile key holding the Session Origin Cache (JSON array of hostnames).
pub const SESSION_DATA_KEY: &str = "MyWebGuard_Data";

/// Durable sentinel key for `top_origin`.
pub fn mutex_key(top_origin: &str) -> String {
    format!("mutex:{top_origin}")
}

/// Durable Rule Set key for `top_origin`.
pub fn rules_key(top_origin: &str) -> String {
    format!("rules:{top_origin}")
}
