//! Top-level facade crate for webguard.
//!
//! Re-exports core types and the engine library so users can depend on a single crate.

pub mod core {
    pub use webguard_core::*;
}

pub mod engine {
    pub use webguard_engine::*;
}
