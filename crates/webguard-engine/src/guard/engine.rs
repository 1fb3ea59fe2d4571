//! Guard Engine assembly.
//!
//! Each interception point pairs a prototype member with a trigger. When the
//! trigger does not fire the original runs without a stack walk. When it
//! fires the call is attributed and checked against the Rule Set snapshot
//! taken at startup. Errors while evaluating a trigger fail open.

use std::sync::Arc;

use webguard_core::error::{GuardError, Result};
use webguard_core::origin;
use webguard_core::RuleSet;

use crate::attribution::Attributor;
use crate::intercept::{policy, HostBinding, Interception, Invocation, Policy, Value};
use crate::obs::GuardMetrics;
use crate::policy::{decide, Verdict};

/// How a point is hooked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Method,
    Setter,
}

/// When a call at a point needs a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Always evaluated.
    Always,
    /// Argument `n` is a URL whose hostname differs from the top origin.
    CrossOriginUrlArg(usize),
    /// `setAttribute(name, value)` with `name` equal to `src` in any case and a
    /// cross-origin `value`.
    SrcAttribute,
}

impl Trigger {
    pub fn fires(self, top_origin: &str, args: &[Value]) -> Result<bool> {
        match self {
            Trigger::Always => Ok(true),
            Trigger::CrossOriginUrlArg(n) => {
                let url = arg_text(args, n)?;
                Ok(origin::is_url_cross_origin(top_origin, &url))
            }
            Trigger::SrcAttribute => {
                let name = arg_text(args, 0)?;
                let value = arg_text(args, 1)?;
                Ok(name.eq_ignore_ascii_case("src") && origin::is_url_cross_origin(top_origin, &value))
            }
        }
    }
}

fn arg_text(args: &[Value], n: usize) -> Result<String> {
    args.get(n)
        .and_then(Value::to_text)
        .ok_or_else(|| GuardError::Parse(format!("argument {n} has no string form")))
}

#[derive(Debug, Clone, Copy)]
pub struct InterceptionPoint {
    pub label: &'static str,
    pub target: &'static str,
    pub member: &'static str,
    pub hook: Hook,
    pub trigger: Trigger,
}

pub const INTERCEPTION_POINTS: [InterceptionPoint; 8] = [
    InterceptionPoint {
        label: "HTMLImageElement.src",
        target: "HTMLImageElement",
        member: "src",
        hook: Hook::Setter,
        trigger: Trigger::CrossOriginUrlArg(0),
    },
    InterceptionPoint {
        label: "HTMLScriptElement.src",
        target: "HTMLScriptElement",
        member: "src",
        hook: Hook::Setter,
        trigger: Trigger::CrossOriginUrlArg(0),
    },
    InterceptionPoint {
        label: "Element.innerHTML",
        target: "Element",
        member: "innerHTML",
        hook: Hook::Setter,
        trigger: Trigger::Always,
    },
    InterceptionPoint {
        label: "Element.setAttribute",
        target: "Element",
        member: "setAttribute",
        hook: Hook::Method,
        trigger: Trigger::SrcAttribute,
    },
    InterceptionPoint {
        label: "Element.appendChild",
        target: "Element",
        member: "appendChild",
        hook: Hook::Method,
        trigger: Trigger::Always,
    },
    InterceptionPoint {
        label: "Document.createElement",
        target: "Document",
        member: "createElement",
        hook: Hook::Method,
        trigger: Trigger::Always,
    },
    InterceptionPoint {
        label: "XMLHttpRequest.open",
        target: "XMLHttpRequest",
        member: "open",
        hook: Hook::Method,
        trigger: Trigger::CrossOriginUrlArg(1),
    },
    InterceptionPoint {
        label: "Node.insertBefore",
        target: "Node",
        member: "insertBefore",
        hook: Hook::Method,
        trigger: Trigger::Always,
    },
];

/// Which points were installed and which failed.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed: Vec<&'static str>,
    pub failed: Vec<(&'static str, GuardError)>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct GuardState {
    top_origin: String,
    rules: RuleSet,
    attributor: Attributor,
    metrics: Arc<GuardMetrics>,
}

impl GuardState {
    fn guard(&self, point: &InterceptionPoint, inv: &Invocation<'_>, proceed: &dyn Fn() -> Value) -> Option<Value> {
        let fires = match point.trigger.fires(&self.top_origin, inv.args) {
            Ok(fires) => fires,
            Err(e) => {
                tracing::debug!(point = point.label, error = %e, "trigger not evaluable, proceeding");
                false
            }
        };
        if !fires {
            return Some(proceed());
        }

        let origin = match self.attributor.attribute() {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::debug!(point = point.label, error = %e, "unattributable call");
                self.metrics.attribution_failures.inc(&[("point", point.label)]);
                None
            }
        };

        let verdict = decide(&self.rules, origin.as_deref());
        self.metrics
            .interceptions
            .inc(&[("point", point.label), ("verdict", verdict.as_str())]);

        match verdict {
            Verdict::Allow => Some(proceed()),
            Verdict::Block => {
                tracing::info!(point = point.label, origin = origin.as_deref().unwrap_or(""), "blocked");
                None
            }
        }
    }
}

/// Guard for one frame, holding the Rule Set snapshot it was built with.
///
/// The snapshot is never refreshed; rule changes apply from the next page load.
#[derive(Clone)]
pub struct GuardEngine {
    state: Arc<GuardState>,
}

impl GuardEngine {
    pub fn new(top_origin: &str, rules: RuleSet, attributor: Attributor, metrics: Arc<GuardMetrics>) -> Self {
        Self {
            state: Arc::new(GuardState {
                top_origin: top_origin.to_string(),
                rules,
                attributor,
                metrics,
            }),
        }
    }

    pub fn top_origin(&self) -> &str {
        &self.state.top_origin
    }

    pub fn rules(&self) -> &RuleSet {
        &self.state.rules
    }

    pub fn attributor(&self) -> &Attributor {
        &self.state.attributor
    }

    /// Patch every interception point. Points fail independently: a missing
    /// member is logged and reported, and the remaining points still install.
    pub fn install(&self, host: &dyn HostBinding) -> InstallReport {
        tracing::info!(top = %self.state.top_origin, rules = self.state.rules.len(), "guard engine installing");

        let mut report = InstallReport::default();
        for point in INTERCEPTION_POINTS {
            let policy = self.policy_for(point);
            let interception = match point.hook {
                Hook::Method => Interception::Method(policy),
                Hook::Setter => Interception::Accessor {
                    get: None,
                    set: Some(policy),
                },
            };

            match host.install(point.target, point.member, interception) {
                Ok(()) => report.installed.push(point.label),
                Err(e) => {
                    tracing::warn!(point = point.label, code = e.kind().as_str(), error = %e, "interception point not installed");
                    self.state.metrics.install_failures.inc(&[("point", point.label)]);
                    report.failed.push((point.label, e));
                }
            }
        }
        report
    }

    fn policy_for(&self, point: InterceptionPoint) -> Policy {
        let state = Arc::clone(&self.state);
        policy(move |inv, proceed| state.guard(&point, inv, proceed))
    }
}
