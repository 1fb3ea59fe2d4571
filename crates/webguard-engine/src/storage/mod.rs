//! Storage backends shared between execution contexts.
//!
//! Two store shapes exist:
//! - `DurableStore`: cross-session, async (extension storage, a JSON file).
//! - `VolatileStore`: session-scoped, synchronous (the page's session store).
//!
//! Neither offers transactions. Read-modify-write sequences go through the
//! sentinel-key mutexes in [`mutex`].

pub mod file;
pub mod memory;
pub mod mutex;

use async_trait::async_trait;

use webguard_core::error::Result;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use mutex::{Backoff, DurableMutex, VolatileGuard, VolatileMutex};

/// Durable string-keyed store.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Write `value` only if `key` is absent; returns whether it was written.
    ///
    /// The default is a plain read followed by a write and is not atomic.
    /// Backends that can do better override it.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        if self.get_item(key).await?.is_some() {
            return Ok(false);
        }
        self.set_item(key, value).await?;
        Ok(true)
    }
}

/// Volatile string-keyed store, synchronous like a page's session storage.
pub trait VolatileStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;

    /// See [`DurableStore::set_if_absent`].
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        if self.get_item(key)?.is_some() {
            return Ok(false);
        }
        self.set_item(key, value)?;
        Ok(true)
    }
}
