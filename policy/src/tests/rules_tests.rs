//! Tests for rule evaluation.

use crate::rules::{HostDecider, NetworkRules, RuleAction};
use std::sync::Arc;

fn rules_from_yaml(yaml: &str) -> crate::CompiledRules {
    NetworkRules::from_yaml(yaml).unwrap().compile()
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_yaml_payload_field_names_are_camel_case() {
    let rules = NetworkRules::from_yaml(
        r#"
blockByDefault: true
allowedHosts:
  - api.example.com
blockedHosts:
  - "*.tracker.com"
"#,
    )
    .unwrap();

    assert!(rules.block_by_default);
    assert_eq!(rules.allowed_hosts, vec!["api.example.com"]);
    assert_eq!(rules.blocked_hosts, vec!["*.tracker.com"]);
}

#[test]
fn test_missing_fields_default_to_permissive_empty_lists() {
    let rules = NetworkRules::from_yaml("{}").unwrap();
    assert!(!rules.block_by_default);
    assert!(rules.allowed_hosts.is_empty());
    assert!(rules.blocked_hosts.is_empty());
}

#[test]
fn test_malformed_yaml_is_an_error() {
    assert!(NetworkRules::from_yaml("blockByDefault: [oops").is_err());
}

// =============================================================================
// Precedence
// =============================================================================

#[test]
fn test_block_by_default_with_allowlist() {
    let rules = rules_from_yaml(
        r#"
blockByDefault: true
allowedHosts:
  - api.example.com
"#,
    );

    assert_eq!(rules.decide("api.example.com").action, RuleAction::Allow);
    assert_eq!(rules.decide("evil.com").action, RuleAction::Block);
}

#[test]
fn test_allow_by_default_with_blocklist() {
    let rules = rules_from_yaml(
        r#"
blockByDefault: false
blockedHosts:
  - "*.tracker.com"
"#,
    );

    assert_eq!(rules.decide("ads.tracker.com").action, RuleAction::Block);
    assert_eq!(rules.decide("anything-else.org").action, RuleAction::Allow);
}

#[test]
fn test_block_list_wins_over_allow_list() {
    let rules = rules_from_yaml(
        r#"
blockByDefault: false
allowedHosts:
  - "*.example.com"
blockedHosts:
  - api.example.com
"#,
    );

    // Host matches both lists; the block entry decides.
    let decision = rules.decide("api.example.com");
    assert_eq!(decision.action, RuleAction::Block);
    assert_eq!(decision.matched_pattern.as_deref(), Some("api.example.com"));

    // Sibling subdomain only matches the allow list.
    assert_eq!(rules.decide("web.example.com").action, RuleAction::Allow);
}

#[test]
fn test_explicit_block_is_independent_of_allow_membership() {
    let rules = rules_from_yaml(
        r#"
allowedHosts:
  - api.example.com
blockedHosts:
  - api.example.com
"#,
    );

    assert!(rules.is_explicitly_blocked("api.example.com"));
    assert!(!rules.is_explicitly_blocked("web.example.com"));
}

// =============================================================================
// Wildcards
// =============================================================================

#[test]
fn test_subdomain_wildcard_excludes_apex_domain() {
    let rules = rules_from_yaml(
        r#"
blockByDefault: true
allowedHosts:
  - "*.example.com"
"#,
    );

    assert_eq!(rules.decide("api.example.com").action, RuleAction::Allow);
    assert_eq!(rules.decide("x.y.example.com").action, RuleAction::Allow);
    assert_eq!(rules.decide("example.com").action, RuleAction::Block);
}

// =============================================================================
// Host-decider callback
// =============================================================================

#[test]
fn test_decider_breaks_ties_for_unlisted_hosts() {
    let rules = rules_from_yaml(
        r#"
blockByDefault: false
allowedHosts:
  - api.example.com
blockedHosts:
  - "*.tracker.com"
"#,
    );
    let decider: HostDecider = Arc::new(|host| host.ends_with(".internal"));

    // Listed hosts are unaffected by the callback.
    assert_eq!(
        rules.decide_with("api.example.com", Some(&decider)).action,
        RuleAction::Allow
    );
    assert_eq!(
        rules.decide_with("ads.tracker.com", Some(&decider)).action,
        RuleAction::Block
    );
    // Unlisted hosts go to the callback instead of the default.
    assert_eq!(
        rules.decide_with("db.internal", Some(&decider)).action,
        RuleAction::Block
    );
    assert_eq!(
        rules.decide_with("other.org", Some(&decider)).action,
        RuleAction::Allow
    );
}
