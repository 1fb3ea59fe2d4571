use std::time::Duration;

use serde::Deserialize;
use webguard_core::error::{GuardError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    pub version: u32,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub reconcile: ReconcileSection,
}

impl GuardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GuardError::UnsupportedVersion);
        }

        self.storage.validate()?;
        self.reconcile.validate()?;

        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            version: 1,
            storage: StorageSection::default(),
            reconcile: ReconcileSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// JSON file backing the durable store; in-memory when absent.
    #[serde(default)]
    pub durable_path: Option<String>,

    #[serde(default = "default_lock_poll_ms")]
    pub lock_poll_ms: u64,

    #[serde(default = "default_lock_max_backoff_ms")]
    pub lock_max_backoff_ms: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            durable_path: None,
            lock_poll_ms: default_lock_poll_ms(),
            lock_max_backoff_ms: default_lock_max_backoff_ms(),
        }
    }
}

impl StorageSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.lock_poll_ms) {
            return Err(GuardError::BadConfig(
                "storage.lock_poll_ms must be between 1 and 1000".into(),
            ));
        }
        if self.lock_max_backoff_ms < self.lock_poll_ms || self.lock_max_backoff_ms > 10000 {
            return Err(GuardError::BadConfig(
                "storage.lock_max_backoff_ms must be between lock_poll_ms and 10000".into(),
            ));
        }
        Ok(())
    }

    pub fn lock_poll(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }

    pub fn lock_max_backoff(&self) -> Duration {
        Duration::from_millis(self.lock_max_backoff_ms)
    }
}

fn default_lock_poll_ms() -> u64 {
    20
}
fn default_lock_max_backoff_ms() -> u64 {
    320
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl ReconcileSection {
    pub fn validate(&self) -> Result<()> {
        if !(50..=60000).contains(&self.interval_ms) {
            return Err(GuardError::BadConfig(
                "reconcile.interval_ms must be between 50 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    300
}
