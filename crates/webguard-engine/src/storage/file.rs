//! Durable store persisted as a single JSON object file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use webguard_core::error::{GuardError, Result};

use super::DurableStore;

/// JSON-file durable store. Every write rewrites the whole file.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(GuardError::Storage(format!(
                    "read {} failed: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Write `next` to disk, then make it the live map. A failed write leaves
    /// the live map untouched.
    async fn commit(
        &self,
        entries: &mut BTreeMap<String, String>,
        next: BTreeMap<String, String>,
    ) -> Result<()> {
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| GuardError::Storage(format!("write {} failed: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| GuardError::Storage(format!("replace {} failed: {e}", self.path.display())))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.commit(&mut entries, next).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.commit(&mut entries, next).await
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.commit(&mut entries, next).await?;
        Ok(true)
    }
}
