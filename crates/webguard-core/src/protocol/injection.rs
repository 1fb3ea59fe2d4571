//! Policy injection payload.
//!
//! The Rule Set crosses into the guard sandbox exactly once, as base64 of its
//! JSON form. Decoding must yield exactly the Rule Set shape or fail.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{GuardError, Result};
use crate::protocol::rules::RuleSet;

/// Encode a Rule Set as base64 JSON.
pub fn encode_payload(rules: &RuleSet) -> Result<String> {
    let json = rules.to_json()?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decode a base64 JSON payload into a Rule Set.
pub fn decode_payload(payload: &str) -> Result<RuleSet> {
    let raw = STANDARD
        .decode(payload.trim())
        .map_err(|e| GuardError::Parse(format!("invalid payload base64: {e}")))?;
    let json = String::from_utf8(raw)
        .map_err(|e| GuardError::Parse(format!("payload is not utf-8: {e}")))?;
    let rules = RuleSet::from_json(&json)?;
    tracing::trace!(bytes = payload.len(), origins = rules.len(), "policy payload decoded");
    Ok(rules)
}
