//! Network rules collaborator for airlock.
//!
//! This crate provides the allow/block rule set the interception layer is
//! checked against: parsing, compilation to matchable patterns, and a
//! swappable [`RulesStore`] that plays the role of the managed-side policy
//! object (tests install a configuration, run, then clear it).
//!
//! # Example
//!
//! ```
//! use airlock_policy::{NetworkRules, RuleAction};
//!
//! let yaml = r#"
//! blockByDefault: true
//! allowedHosts:
//!   - api.example.com
//!   - "*.internal.test"
//! blockedHosts:
//!   - "*.tracker.com"
//! "#;
//!
//! let rules = NetworkRules::from_yaml(yaml).unwrap().compile();
//!
//! assert_eq!(rules.decide("api.example.com").action, RuleAction::Allow);
//! assert_eq!(rules.decide("evil.com").action, RuleAction::Block);
//! // Block-list membership wins even for allowed lookups.
//! assert!(rules.is_explicitly_blocked("ads.tracker.com"));
//! ```

mod error;
mod rules;
mod store;

#[cfg(test)]
mod tests;

pub use error::{PolicyError, Result};
pub use rules::{CompiledRules, HostDecider, NetworkRules, RuleAction, RuleDecision};
pub use store::RulesStore;
