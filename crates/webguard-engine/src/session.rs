//! Session Origin Cache: origins observed in this browsing session.
//!
//! Stored as a JSON array under `MyWebGuard_Data` in the volatile store,
//! shared by every same-origin frame of the session and always containing
//! at least the top origin. Writers serialize through `MyWebGuard_Mutex`.

use std::sync::{Arc, Mutex};

use webguard_core::error::Result;
use webguard_core::protocol::keys::{SESSION_DATA_KEY, SESSION_MUTEX_KEY};

use crate::config::StorageSection;
use crate::storage::{VolatileMutex, VolatileStore};

pub struct SessionOriginCache {
    store: Arc<dyn VolatileStore>,
    mutex: VolatileMutex,
    top_origin: String,
    /// Last list this context wrote or read back; skips the lock for repeats.
    known: Mutex<Vec<String>>,
}

impl SessionOriginCache {
    pub fn new(store: Arc<dyn VolatileStore>, top_origin: &str, cfg: &StorageSection) -> Self {
        let mutex = VolatileMutex::new(
            store.clone(),
            SESSION_MUTEX_KEY,
            cfg.lock_poll(),
            cfg.lock_max_backoff(),
        );
        Self {
            store,
            mutex,
            top_origin: top_origin.to_string(),
            known: Mutex::new(Vec::new()),
        }
    }

    pub fn top_origin(&self) -> &str {
        &self.top_origin
    }

    /// Add `origin` if it is not listed yet. Returns whether the stored list grew.
    pub fn record(&self, origin: &str) -> Result<bool> {
        let already_known = self
            .known
            .lock()
            .map(|k| k.iter().any(|o| o == origin))
            .unwrap_or(false);
        if already_known {
            return Ok(false);
        }

        let (list, added) = {
            let _guard = self.mutex.lock()?;
            let mut list = self.load()?;
            let added = if list.iter().any(|o| o == origin) {
                false
            } else {
                list.push(origin.to_string());
                self.store.set_item(SESSION_DATA_KEY, &serde_json::to_string(&list)?)?;
                true
            };
            (list, added)
        };

        if let Ok(mut known) = self.known.lock() {
            *known = list;
        }
        Ok(added)
    }

    /// Current list; just the top origin when nothing is stored yet.
    pub fn load(&self) -> Result<Vec<String>> {
        let raw = self.raw()?;
        self.parse(raw.as_deref())
    }

    /// Stored JSON as-is, for cheap change detection.
    pub fn raw(&self) -> Result<Option<String>> {
        self.store.get_item(SESSION_DATA_KEY)
    }

    pub fn parse(&self, raw: Option<&str>) -> Result<Vec<String>> {
        match raw {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(vec![self.top_origin.clone()]),
        }
    }

    pub fn force_unlock(&self) -> Result<()> {
        self.mutex.force_unlock()
    }
}
