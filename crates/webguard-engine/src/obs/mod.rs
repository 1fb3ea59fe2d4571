//! Lightweight in-process metrics (dependency-free).
//!
//! Counters are stored as atomics behind `DashMap` and rendered in Prometheus
//! text format on demand (the binary prints them after a run).

pub mod metrics;

pub use metrics::{CounterVec, GuardMetrics};
