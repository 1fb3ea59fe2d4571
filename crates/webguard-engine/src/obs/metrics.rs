//! Minimal metrics registry for the guard.
//!
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering; rendering sorts series so output is stable across runs.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let key = label_key(labels);
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 when never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.value().load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over every label set.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        let mut series: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| {
                let label_str = r
                    .key()
                    .iter()
                    .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                (label_str, r.value().load(Ordering::Relaxed))
            })
            .collect();
        series.sort();
        for (label_str, val) in series {
            if label_str.is_empty() {
                let _ = writeln!(out, "{} {}", name, val);
            } else {
                let _ = writeln!(out, "{}{{{}}} {}", name, label_str, val);
            }
        }
    }
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

#[derive(Default)]
pub struct GuardMetrics {
    pub interceptions: CounterVec,
    pub attribution_failures: CounterVec,
    pub install_failures: CounterVec,
    pub reconciled_origins: CounterVec,
}

impl GuardMetrics {
    /// Render all registered metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.interceptions.render("webguard_interceptions_total", &mut out);
        self.attribution_failures.render("webguard_attribution_failures_total", &mut out);
        self.install_failures.render("webguard_install_failures_total", &mut out);
        self.reconciled_origins.render("webguard_reconciled_origins_total", &mut out);
        out
    }
}
