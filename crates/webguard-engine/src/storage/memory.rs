use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use webguard_core::error::Result;

use super::{DurableStore, VolatileStore};

/// In-process store usable as either backend.
///
/// `set_if_absent` is atomic here (single shard entry), so sentinel locks over
/// a `MemoryStore` hold the mutual-exclusion property even under contention.
#[derive(Default)]
pub struct MemoryStore {
    map: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .map
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort();
        out
    }

    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).map(|v| v.value().clone())
    }

    fn put_if_absent(&self, key: &str, value: &str) -> bool {
        match self.map.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(value.to_string());
                true
            }
        }
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        Ok(self.put_if_absent(key, value))
    }
}

impl VolatileStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        Ok(self.put_if_absent(key, value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn set_if_absent_writes_once() {
        let store = MemoryStore::new();
        assert!(VolatileStore::set_if_absent(&store, "k", "1").unwrap());
        assert!(!VolatileStore::set_if_absent(&store, "k", "2").unwrap());
        assert_eq!(VolatileStore::get_item(&store, "k").unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn durable_remove_frees_key() {
        let store = MemoryStore::new();
        DurableStore::set_item(&store, "k", "v").await.unwrap();
        DurableStore::remove_item(&store, "k").await.unwrap();
        assert!(DurableStore::get_item(&store, "k").await.unwrap().is_none());
        assert!(store.is_empty());
    }
}
