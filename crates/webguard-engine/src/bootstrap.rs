//! Bootstrapper: runs once per frame on load.
//!
//! Foreign embedded frames get their document cleared and nothing else.
//! Other frames recover stale locks, read the Rule Set, push it into a fresh
//! guard sandbox and, in the top frame only, start the reconciler.

use std::sync::Arc;

use tokio::task::JoinHandle;

use webguard_core::error::{GuardError, Result};

use crate::attribution::Attributor;
use crate::context::{FrameContext, FrameKind};
use crate::guard::{self, GuardEngine, InstallReport};
use crate::policy::PolicyStore;
use crate::reconcile::Reconciler;
use crate::session::SessionOriginCache;

pub enum BootOutcome {
    /// Foreign frame: document cleared, no guard injected.
    Removed { origin: String },
    Guarded(GuardedFrame),
}

/// A frame with its guard installed.
pub struct GuardedFrame {
    pub kind: FrameKind,
    pub top_origin: String,
    pub engine: GuardEngine,
    pub report: InstallReport,
    pub policy: Arc<PolicyStore>,
    pub cache: Arc<SessionOriginCache>,
    /// Present in the top frame; resolves only when the loop fails.
    pub reconciler: Option<JoinHandle<GuardError>>,
}

impl GuardedFrame {
    /// Document teardown: stop the reconciler if one is running.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.reconciler.take() {
            handle.abort();
        }
    }
}

impl Drop for GuardedFrame {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct Bootstrapper {
    ctx: FrameContext,
}

impl Bootstrapper {
    pub fn new(ctx: FrameContext) -> Self {
        Self { ctx }
    }

    pub async fn boot(self) -> Result<BootOutcome> {
        let ctx = self.ctx;
        let (kind, top_origin) = ctx.frame.classify()?;

        if kind == FrameKind::Foreign {
            ctx.realm.clear_document();
            tracing::info!(origin = %top_origin, url = %ctx.frame.url, "removed foreign iframe");
            return Ok(BootOutcome::Removed { origin: top_origin });
        }

        let cache = Arc::new(SessionOriginCache::new(ctx.volatile.clone(), &top_origin, &ctx.cfg.storage));
        if let Err(e) = cache.force_unlock() {
            tracing::warn!(error = %e, "session lock recovery failed");
        }
        let policy = Arc::new(PolicyStore::new(ctx.durable.clone(), &top_origin, &ctx.cfg.storage));
        if let Err(e) = policy.force_unlock().await {
            tracing::warn!(error = %e, "durable lock recovery failed");
        }

        let rules = policy.get_rules_or_default().await;
        let (sender, sandbox) = guard::channel();
        sender.send(&rules)?;

        let attributor = Attributor::new(ctx.realm.script_stack(), cache.clone());
        let (engine, report) = sandbox
            .open(&top_origin, attributor, ctx.metrics.clone(), ctx.realm.as_ref())
            .await?;

        let reconciler = if kind == FrameKind::Top {
            tracing::info!(top = %top_origin, url = %ctx.frame.url, "service running");
            let rec = Reconciler::new(
                cache.clone(),
                policy.clone(),
                ctx.cfg.reconcile.interval(),
                ctx.metrics.clone(),
            );
            Some(tokio::spawn(rec.run()))
        } else {
            None
        };

        Ok(BootOutcome::Guarded(GuardedFrame {
            kind,
            top_origin,
            engine,
            report,
            policy,
            cache,
            reconciler,
        }))
    }
}
