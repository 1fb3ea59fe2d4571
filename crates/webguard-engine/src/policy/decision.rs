use webguard_core::RuleSet;

/// Outcome of a policy check for one intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Block => "block",
        }
    }
}

/// Whether calls attributed to `origin` are blocked.
///
/// Unknown origins are blocked (default deny). This is an in-memory default
/// only; the reconciler makes it explicit in the durable store.
pub fn is_origin_blocked(rules: &RuleSet, origin: &str) -> bool {
    rules.disposition(origin).unwrap_or(true)
}

/// Decide for an attributed origin; unattributable calls are allowed.
pub fn decide(rules: &RuleSet, origin: Option<&str>) -> Verdict {
    match origin {
        Some(o) if is_origin_blocked(rules, o) => Verdict::Block,
        _ => Verdict::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        let mut r = RuleSet::default_for("a.com");
        r.set("b.com", true);
        r.set("c.com", false);
        r
    }

    #[test]
    fn explicit_dispositions_win() {
        let r = rules();
        assert!(is_origin_blocked(&r, "b.com"));
        assert!(!is_origin_blocked(&r, "c.com"));
        assert!(!is_origin_blocked(&r, "a.com"));
    }

    #[test]
    fn unknown_origin_is_denied() {
        assert!(is_origin_blocked(&rules(), "d.org"));
        assert_eq!(decide(&rules(), Some("d.org")), Verdict::Block);
    }

    #[test]
    fn unattributable_call_is_allowed() {
        assert_eq!(decide(&rules(), None), Verdict::Allow);
    }
}
