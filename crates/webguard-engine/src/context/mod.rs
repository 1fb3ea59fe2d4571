//! Per-frame context types shared across layers.
//!
//! A `FrameContext` is the explicit state container of one execution context:
//! built when the frame starts, dropped when it ends, and connected to other
//! contexts only through the stores it holds.

pub mod frame;

pub use frame::{FrameContext, FrameInfo, FrameKind};
