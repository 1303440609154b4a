//! Rule set definition and evaluation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use airlock_protocol::hostmatch::{first_match, HostPattern};

use crate::error::Result;

/// The configuration payload: which hosts may be reached.
///
/// Field names follow the wire form used by embedders
/// (`blockByDefault`, `allowedHosts`, `blockedHosts`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkRules {
    /// Block hosts that match neither list.
    pub block_by_default: bool,
    /// Patterns for hosts that are allowed. Order is significant only
    /// for reporting which pattern matched.
    pub allowed_hosts: Vec<String>,
    /// Patterns for hosts that are explicitly blocked. A match here wins
    /// over any allow-list match.
    pub blocked_hosts: Vec<String>,
}

impl NetworkRules {
    /// Parse a rules payload from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Compile the pattern lists for matching.
    pub fn compile(&self) -> CompiledRules {
        CompiledRules {
            block_by_default: self.block_by_default,
            allowed: self.allowed_hosts.iter().map(|p| HostPattern::parse(p)).collect(),
            blocked: self.blocked_hosts.iter().map(|p| HostPattern::parse(p)).collect(),
        }
    }
}

/// Optional embedder callback consulted for hosts no list names.
/// Returns `true` to block the host.
pub type HostDecider = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The action a rule evaluation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Allow,
    Block,
}

/// Result of evaluating a host against the rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDecision {
    pub action: RuleAction,
    /// The pattern that decided the outcome, if one matched.
    pub matched_pattern: Option<String>,
}

impl RuleDecision {
    pub fn is_blocked(&self) -> bool {
        self.action == RuleAction::Block
    }

    fn allow(pattern: Option<&str>) -> Self {
        Self {
            action: RuleAction::Allow,
            matched_pattern: pattern.map(str::to_string),
        }
    }

    fn block(pattern: Option<&str>) -> Self {
        Self {
            action: RuleAction::Block,
            matched_pattern: pattern.map(str::to_string),
        }
    }
}

/// Rule set with pattern lists compiled for matching.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    block_by_default: bool,
    allowed: Vec<HostPattern>,
    blocked: Vec<HostPattern>,
}

impl CompiledRules {
    /// Evaluate a host. Precedence: explicit block, then allow list, then
    /// the default.
    pub fn decide(&self, host: &str) -> RuleDecision {
        self.decide_with(host, None)
    }

    /// Evaluate a host with an optional embedder callback. The callback is
    /// a tie-breaker for hosts no list names; the lists stay authoritative.
    pub fn decide_with(&self, host: &str, decider: Option<&HostDecider>) -> RuleDecision {
        if let Some(pattern) = first_match(&self.blocked, host) {
            return RuleDecision::block(Some(pattern));
        }
        if let Some(pattern) = first_match(&self.allowed, host) {
            return RuleDecision::allow(Some(pattern));
        }
        if let Some(decider) = decider {
            if decider(host) {
                return RuleDecision::block(None);
            }
            return RuleDecision::allow(None);
        }
        if self.block_by_default {
            RuleDecision::block(None)
        } else {
            RuleDecision::allow(None)
        }
    }

    /// Whether `host` matches the explicit block list, regardless of any
    /// allow-list membership.
    pub fn is_explicitly_blocked(&self, host: &str) -> bool {
        first_match(&self.blocked, host).is_some()
    }
}
