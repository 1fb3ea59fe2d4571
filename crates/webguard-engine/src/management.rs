//! Management surface data path: the rows the rule editor shows for the
//! active tab, and the write path behind each checkbox.

use std::sync::Arc;

use webguard_core::error::Result;
use webguard_core::origin;

use crate::config::StorageSection;
use crate::policy::PolicyStore;
use crate::storage::DurableStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    pub origin: String,
    pub blocked: bool,
}

pub struct ManagementSurface {
    policy: PolicyStore,
}

impl ManagementSurface {
    /// Surface for the tab currently showing `tab_url`; `None` when the URL
    /// has no hostname (e.g. internal pages).
    pub fn for_tab_url(tab_url: &str, store: Arc<dyn DurableStore>, cfg: &StorageSection) -> Option<Self> {
        let top = origin::hostname_opt(tab_url)?;
        Some(Self {
            policy: PolicyStore::new(store, &top, cfg),
        })
    }

    pub fn top_origin(&self) -> &str {
        self.policy.top_origin()
    }

    /// Allowed origins first, then blocked; alphabetical within each group.
    pub async fn rows(&self) -> Result<Vec<RuleRow>> {
        let rules = self.policy.get_rules().await?;
        let mut rows: Vec<RuleRow> = rules
            .origins
            .into_iter()
            .map(|(origin, blocked)| RuleRow { origin, blocked })
            .collect();
        rows.sort_by(|a, b| a.blocked.cmp(&b.blocked).then_with(|| a.origin.cmp(&b.origin)));
        Ok(rows)
    }

    pub async fn set_disposition(&self, origin: &str, blocked: bool) -> Result<()> {
        self.policy.add_origin_rule(origin, blocked).await?;
        tracing::info!(top = %self.policy.top_origin(), origin, blocked, "disposition changed");
        Ok(())
    }
}
