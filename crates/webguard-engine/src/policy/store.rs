//! Durable Rule Set access for one top origin.

use std::sync::Arc;

use webguard_core::error::Result;
use webguard_core::protocol::keys::{mutex_key, rules_key};
use webguard_core::RuleSet;

use crate::config::StorageSection;
use crate::storage::{DurableMutex, DurableStore};

/// Rule Set for one top origin, stored as JSON under `rules:<origin>` and
/// guarded by `mutex:<origin>` for read-modify-write.
pub struct PolicyStore {
    store: Arc<dyn DurableStore>,
    top_origin: String,
    rules_key: String,
    mutex: DurableMutex,
}

impl PolicyStore {
    pub fn new(store: Arc<dyn DurableStore>, top_origin: &str, cfg: &StorageSection) -> Self {
        let mutex = DurableMutex::new(
            store.clone(),
            mutex_key(top_origin),
            cfg.lock_poll(),
            cfg.lock_max_backoff(),
        );
        Self {
            store,
            top_origin: top_origin.to_string(),
            rules_key: rules_key(top_origin),
            mutex,
        }
    }

    pub fn top_origin(&self) -> &str {
        &self.top_origin
    }

    /// Current Rule Set; the default one when nothing is stored yet.
    pub async fn get_rules(&self) -> Result<RuleSet> {
        match self.store.get_item(&self.rules_key).await? {
            Some(json) => RuleSet::from_json(&json),
            None => Ok(RuleSet::default_for(&self.top_origin)),
        }
    }

    /// Best-effort read for startup: failures fall back to the default Rule Set.
    pub async fn get_rules_or_default(&self) -> RuleSet {
        match self.get_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!(top = %self.top_origin, error = %e, "rules read failed, using defaults");
                RuleSet::default_for(&self.top_origin)
            }
        }
    }

    /// Set the disposition of `origin` under the durable lock.
    pub async fn add_origin_rule(&self, origin: &str, blocked: bool) -> Result<()> {
        self.mutex
            .with_lock(|| async move {
                let mut rules = self.get_rules().await?;
                rules.set(origin, blocked);
                self.save(&rules).await
            })
            .await
    }

    /// Record `origin` with `blocked` only if it is still absent once the lock
    /// is held. Returns whether it was written.
    pub async fn ensure_origin(&self, origin: &str, blocked: bool) -> Result<bool> {
        self.mutex
            .with_lock(|| async move {
                let mut rules = self.get_rules().await?;
                if rules.contains(origin) {
                    return Ok(false);
                }
                rules.set(origin, blocked);
                self.save(&rules).await?;
                Ok(true)
            })
            .await
    }

    pub async fn force_unlock(&self) -> Result<()> {
        self.mutex.force_unlock().await
    }

    async fn save(&self, rules: &RuleSet) -> Result<()> {
        let json = rules.to_json()?;
        self.store.set_item(&self.rules_key, &json).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::storage::MemoryStore;

    fn policy(store: &Arc<MemoryStore>) -> PolicyStore {
        PolicyStore::new(store.clone(), "a.com", &StorageSection::default())
    }

    #[tokio::test]
    async fn first_read_is_default_rules() {
        let store = Arc::new(MemoryStore::new());
        let rules = policy(&store).get_rules().await.unwrap();
        assert_eq!(rules, RuleSet::default_for("a.com"));
    }

    #[tokio::test]
    async fn add_rule_persists_json_and_releases_lock() {
        let store = Arc::new(MemoryStore::new());
        let p = policy(&store);
        p.add_origin_rule("b.com", true).await.unwrap();

        let raw = DurableStore::get_item(store.as_ref(), "rules:a.com").await.unwrap().unwrap();
        assert_eq!(raw, r#"{"origins":{"a.com":false,"b.com":true}}"#);
        assert!(DurableStore::get_item(store.as_ref(), "mutex:a.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_origin_keeps_user_decision() {
        let store = Arc::new(MemoryStore::new());
        let p = policy(&store);
        p.add_origin_rule("b.com", false).await.unwrap();

        assert!(!p.ensure_origin("b.com", true).await.unwrap());
        assert!(p.ensure_origin("c.com", true).await.unwrap());

        let rules = p.get_rules().await.unwrap();
        assert_eq!(rules.disposition("b.com"), Some(false));
        assert_eq!(rules.disposition("c.com"), Some(true));
    }

    #[tokio::test]
    async fn corrupt_rules_fall_back_on_best_effort_read() {
        let store = Arc::new(MemoryStore::new());
        DurableStore::set_item(store.as_ref(), "rules:a.com", "{oops").await.unwrap();
        let p = policy(&store);

        assert_eq!(p.get_rules().await.unwrap_err().kind().as_str(), "PARSE_FAILURE");
        assert_eq!(p.get_rules_or_default().await, RuleSet::default_for("a.com"));
    }
}
