//! Scenario runner: boots one frame, drives actions through its realm and
//! reports what the guard let through.
//!
//! ```yaml
//! top_url: https://a.com/
//! steps:
//!   - script: https://b.com/lib.js
//!     set_image_src: http://b.com/x.png
//!   - set_attribute: { name: SRC, value: http://c.com/y.js }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use webguard_core::error::{GuardError, Result};
use webguard_core::RuleSet;

use crate::bootstrap::{BootOutcome, Bootstrapper};
use crate::config::GuardConfig;
use crate::context::{FrameContext, FrameInfo, FrameKind};
use crate::intercept::{ObjectRef, Realm, Value};
use crate::obs::GuardMetrics;
use crate::storage::{DurableStore, MemoryStore};

/// Extra wait on top of one reconciliation interval before rules are read back.
const SETTLE_MARGIN: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub top_url: String,
    /// Set for an embedded frame; the top is then `top_url`.
    #[serde(default)]
    pub frame_url: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// URL of the script performing the action; inline when absent.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SetImageSrc(String),
    SetScriptSrc(String),
    SetInnerHtml(String),
    SetAttribute { name: String, value: String },
    /// Tag of the appended child.
    AppendChild(String),
    InsertBefore(String),
    CreateElement(String),
    XhrOpen { method: String, url: String },
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::SetImageSrc(_) => "HTMLImageElement.src",
            Action::SetScriptSrc(_) => "HTMLScriptElement.src",
            Action::SetInnerHtml(_) => "Element.innerHTML",
            Action::SetAttribute { .. } => "Element.setAttribute",
            Action::AppendChild(_) => "Element.appendChild",
            Action::InsertBefore(_) => "Node.insertBefore",
            Action::CreateElement(_) => "Document.createElement",
            Action::XhrOpen { .. } => "XMLHttpRequest.open",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub label: &'static str,
    pub script: Option<String>,
    /// Whether the original behaviour ran.
    pub executed: bool,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub top_origin: String,
    pub frame: FrameKind,
    /// Foreign frame whose document was cleared; no steps ran.
    pub removed: bool,
    pub steps: Vec<StepOutcome>,
    pub session_origins: Vec<String>,
    pub rules: RuleSet,
}

impl ScenarioReport {
    pub fn executed(&self) -> usize {
        self.steps.iter().filter(|s| s.executed).count()
    }

    pub fn suppressed(&self) -> usize {
        self.steps.len() - self.executed()
    }
}

pub fn load_from_file(path: &str) -> Result<Scenario> {
    let s = std::fs::read_to_string(path).map_err(|e| GuardError::BadConfig(format!("read {path}: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<Scenario> {
    serde_yaml::from_str(s).map_err(|e| GuardError::BadConfig(format!("scenario yaml: {e}")))
}

/// Boot a frame for `scenario`, run its steps and read the rules back after
/// one reconciliation interval.
pub async fn run(
    scenario: &Scenario,
    cfg: &GuardConfig,
    durable: Arc<dyn DurableStore>,
    metrics: Arc<GuardMetrics>,
) -> Result<ScenarioReport> {
    let frame = match &scenario.frame_url {
        Some(url) => FrameInfo::embedded(url, Some(&scenario.top_url)),
        None => FrameInfo::top(&scenario.top_url),
    };
    let realm = Arc::new(Realm::with_dom());
    let ctx = FrameContext {
        frame,
        realm: realm.clone(),
        durable,
        volatile: Arc::new(MemoryStore::new()),
        metrics,
        cfg: cfg.clone(),
    };

    let guarded = match Bootstrapper::new(ctx).boot().await? {
        BootOutcome::Removed { origin } => {
            return Ok(ScenarioReport {
                rules: RuleSet::default_for(&origin),
                top_origin: origin,
                frame: FrameKind::Foreign,
                removed: true,
                steps: Vec::new(),
                session_origins: Vec::new(),
            });
        }
        BootOutcome::Guarded(g) => g,
    };

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        let before = realm.effects().len();
        realm.run_script(step.script.as_deref(), || perform(&realm, &step.action))?;
        let executed = realm.effects().len() > before;
        tracing::debug!(label = step.action.label(), executed, "step done");
        steps.push(StepOutcome {
            label: step.action.label(),
            script: step.script.clone(),
            executed,
        });
    }

    tokio::time::sleep(cfg.reconcile.interval() + SETTLE_MARGIN).await;

    Ok(ScenarioReport {
        top_origin: guarded.top_origin.clone(),
        frame: guarded.kind,
        removed: false,
        steps,
        session_origins: guarded.cache.load()?,
        rules: guarded.policy.get_rules().await?,
    })
}

fn perform(realm: &Realm, action: &Action) -> Result<()> {
    let document = realm
        .document()
        .cloned()
        .ok_or_else(|| GuardError::Internal("realm has no document".into()))?;
    match action {
        Action::SetImageSrc(url) => realm.set(&realm.create_object("HTMLImageElement"), "src", Value::str(url)),
        Action::SetScriptSrc(url) => realm.set(&realm.create_object("HTMLScriptElement"), "src", Value::str(url)),
        Action::SetInnerHtml(html) => realm.set(&realm.create_object("HTMLElement"), "innerHTML", Value::str(html)),
        Action::SetAttribute { name, value } => {
            let el = realm.create_object("HTMLElement");
            realm.call(&el, "setAttribute", &[Value::str(name), Value::str(value)]).map(drop)
        }
        Action::AppendChild(tag) => {
            let parent = realm.create_object("HTMLElement");
            let child = detached(realm, tag);
            realm.call(&parent, "appendChild", &[Value::Object(child)]).map(drop)
        }
        Action::InsertBefore(tag) => {
            let parent = realm.create_object("HTMLElement");
            let child = detached(realm, tag);
            realm.call(&parent, "insertBefore", &[Value::Object(child), Value::Null]).map(drop)
        }
        Action::CreateElement(tag) => realm.call(&document, "createElement", &[Value::str(tag)]).map(drop),
        Action::XhrOpen { method, url } => {
            let xhr = realm.create_object("XMLHttpRequest");
            realm.call(&xhr, "open", &[Value::str(method), Value::str(url)]).map(drop)
        }
    }
}

// Built straight on the heap so the setup itself is not intercepted.
fn detached(realm: &Realm, tag: &str) -> ObjectRef {
    realm.create_object(crate::intercept::dom::class_for_tag(tag))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn steps_parse_with_optional_script() {
        let s = load_from_str(
            r#"
top_url: https://a.com/
steps:
  - script: https://b.com/lib.js
    set_image_src: http://b.com/x.png
  - set_attribute: { name: SRC, value: "http://c.com/y.js" }
  - xhr_open: { method: GET, url: "https://api.c.com/" }
"#,
        )
        .unwrap();
        assert!(s.frame_url.is_none());
        assert_eq!(s.steps.len(), 3);
        assert_eq!(s.steps[0].script.as_deref(), Some("https://b.com/lib.js"));
        assert_eq!(s.steps[1].action.label(), "Element.setAttribute");
        assert!(s.steps[2].script.is_none());
    }

    #[test]
    fn unknown_action_is_bad_config() {
        let err = load_from_str("top_url: https://a.com/\nsteps:\n  - navigate: x\n").unwrap_err();
        assert_eq!(err.kind().as_str(), "BAD_CONFIG");
    }
}
