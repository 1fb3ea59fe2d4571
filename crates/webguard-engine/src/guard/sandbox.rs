//! One-shot policy delivery into the guard sandbox.
//!
//! The sandbox shares no memory with the bootstrapper. The Rule Set crosses
//! as an encoded payload, sent once at construction time.

use std::sync::Arc;

use tokio::sync::oneshot;

use webguard_core::error::{GuardError, Result};
use webguard_core::protocol::injection::{decode_payload, encode_payload};
use webguard_core::RuleSet;

use crate::attribution::Attributor;
use crate::guard::engine::{GuardEngine, InstallReport};
use crate::intercept::HostBinding;
use crate::obs::GuardMetrics;

/// Create a connected sender/sandbox pair.
pub fn channel() -> (PolicySender, GuardSandbox) {
    let (tx, rx) = oneshot::channel();
    (PolicySender { tx }, GuardSandbox { rx })
}

/// Bootstrapper side. Consumed by `send`.
pub struct PolicySender {
    tx: oneshot::Sender<String>,
}

impl PolicySender {
    pub fn send(self, rules: &RuleSet) -> Result<()> {
        let payload = encode_payload(rules)?;
        self.tx
            .send(payload)
            .map_err(|_| GuardError::Internal("guard sandbox dropped before policy delivery".into()))
    }
}

/// Sandbox side. Consumed by `open`, so the engine is built at most once.
pub struct GuardSandbox {
    rx: oneshot::Receiver<String>,
}

impl GuardSandbox {
    /// Wait for the policy payload, build the engine and install it into `host`.
    pub async fn open(
        self,
        top_origin: &str,
        attributor: Attributor,
        metrics: Arc<GuardMetrics>,
        host: &dyn HostBinding,
    ) -> Result<(GuardEngine, InstallReport)> {
        let payload = self
            .rx
            .await
            .map_err(|_| GuardError::Internal("policy sender dropped without sending".into()))?;
        let rules = decode_payload(&payload)?;

        let engine = GuardEngine::new(top_origin, rules, attributor, metrics);
        let report = engine.install(host);
        Ok((engine, report))
    }
}
