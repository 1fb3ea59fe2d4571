//! Engine config loader (strict parsing).

pub mod schema;

use std::fs;

use webguard_core::error::{GuardError, Result};

pub use schema::{GuardConfig, ReconcileSection, StorageSection};

pub fn load_from_file(path: &str) -> Result<GuardConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GuardError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GuardConfig> {
    let cfg: GuardConfig = serde_yaml::from_str(s)
        .map_err(|e| GuardError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
