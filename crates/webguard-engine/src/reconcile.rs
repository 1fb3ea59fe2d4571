//! Reconciliation loop: promotes session-observed origins into the durable
//! Rule Set with a default disposition of blocked.
//!
//! Runs in the top frame only. Any storage or parse failure ends the loop for
//! good; a dead loop means new origins stop being recorded, nothing more.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use webguard_core::error::{GuardError, Result};

use crate::obs::GuardMetrics;
use crate::policy::PolicyStore;
use crate::session::SessionOriginCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session list identical to the previous tick.
    Unchanged,
    /// Session list changed; `added` origins were written to the durable store.
    Reconciled { added: usize },
}

pub struct Reconciler {
    cache: Arc<SessionOriginCache>,
    policy: Arc<PolicyStore>,
    interval: Duration,
    metrics: Arc<GuardMetrics>,
    // outer None: nothing read yet; inner None: key absent
    last_raw: Option<Option<String>>,
}

impl Reconciler {
    pub fn new(
        cache: Arc<SessionOriginCache>,
        policy: Arc<PolicyStore>,
        interval: Duration,
        metrics: Arc<GuardMetrics>,
    ) -> Self {
        Self {
            cache,
            policy,
            interval,
            metrics,
            last_raw: None,
        }
    }

    /// One pass. Unknown origins are written with `blocked = true`.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let raw = self.cache.raw()?;
        if self.last_raw.as_ref() == Some(&raw) {
            return Ok(TickOutcome::Unchanged);
        }
        let origins = self.cache.parse(raw.as_deref())?;
        self.last_raw = Some(raw);

        let rules = self.policy.get_rules().await?;
        let mut added = 0;
        for origin in origins.iter().filter(|o| !rules.contains(o)) {
            if self.policy.ensure_origin(origin, true).await? {
                tracing::info!(top = %self.policy.top_origin(), %origin, "new code origin blocked by default");
                self.metrics.reconciled_origins.inc(&[]);
                added += 1;
            }
        }
        Ok(TickOutcome::Reconciled { added })
    }

    /// Tick every `interval` until a tick fails; returns that failure.
    pub async fn run(mut self) -> GuardError {
        tracing::info!(top = %self.policy.top_origin(), interval_ms = self.interval.as_millis() as u64, "reconciler running");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                tracing::warn!(top = %self.policy.top_origin(), code = e.kind().as_str(), error = %e, "reconciler stopped");
                return e;
            }
        }
    }
}
