//! Rule Set (JSON): `{ "origins": { "<hostname>": <blocked>, ... } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Mapping from code origin (hostname) to blocked flag, scoped to one top origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub origins: BTreeMap<String, bool>,
}

impl RuleSet {
    /// Rule Set created lazily on first read: the page's own origin is never blocked.
    pub fn default_for(top_origin: &str) -> Self {
        let mut origins = BTreeMap::new();
        origins.insert(top_origin.to_string(), false);
        Self { origins }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Explicit disposition, `None` when the origin has never been recorded.
    pub fn disposition(&self, origin: &str) -> Option<bool> {
        self.origins.get(origin).copied()
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains_key(origin)
    }

    pub fn set(&mut self, origin: &str, blocked: bool) {
        self.origins.insert(origin.to_string(), blocked);
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn default_rules_allow_top_origin() {
        let rules = RuleSet::default_for("a.com");
        assert_eq!(rules.disposition("a.com"), Some(false));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn json_shape_is_origins_object() {
        let mut rules = RuleSet::default_for("a.com");
        rules.set("b.com", true);
        assert_eq!(rules.to_json().unwrap(), r#"{"origins":{"a.com":false,"b.com":true}}"#);
    }

    #[test]
    fn malformed_json_is_parse_failure() {
        let err = RuleSet::from_json("{\"origins\": [").unwrap_err();
        assert_eq!(err.kind().as_str(), "PARSE_FAILURE");
    }
}
