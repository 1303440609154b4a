//! The active-configuration holder.
//!
//! `RulesStore` plays the managed-side policy object's part: tests (or an
//! embedding harness) install a rule set before the code under test runs
//! and clear it afterwards. `check_connection` returns silently while no
//! configuration is active — the inter-test window must not block anything.

use std::sync::{Arc, RwLock};

use log::debug;

use airlock_protocol::{CallerId, OracleCallbacks, PolicyViolation};

use crate::rules::{CompiledRules, NetworkRules};

/// Swappable rule-set holder consulted by the interception layer.
#[derive(Default)]
pub struct RulesStore {
    current: RwLock<Option<CompiledRules>>,
}

impl RulesStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install a configuration, replacing any previous one.
    pub fn set(&self, rules: &NetworkRules) {
        let compiled = rules.compile();
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(compiled);
    }

    /// Remove the active configuration. Subsequent checks pass everything.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Whether a configuration is currently in force.
    pub fn has_active_configuration(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Decide a connection attempt. `Ok(())` when allowed or when no
    /// configuration is active.
    pub fn check_connection(
        &self,
        host: &str,
        port: i32,
        caller: CallerId,
    ) -> std::result::Result<(), PolicyViolation> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        let Some(rules) = guard.as_ref() else {
            return Ok(());
        };
        let decision = rules.decide(host);
        if decision.is_blocked() {
            debug!(
                "blocking {}:{} via {} (pattern: {:?})",
                host, port, caller, decision.matched_pattern
            );
            return Err(PolicyViolation::new(host, port, caller));
        }
        Ok(())
    }

    /// Explicit block-list membership. False while no configuration is
    /// active.
    pub fn is_explicitly_blocked(&self, host: &str) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|rules| rules.is_explicitly_blocked(host))
            .unwrap_or(false)
    }

    /// The decision handles this store exposes to the agent's bridge.
    /// Each handle holds a reference to the store, so the store stays
    /// alive for as long as the bridge keeps them cached.
    pub fn oracle(self: &Arc<Self>) -> OracleCallbacks {
        let check = Arc::clone(self);
        let blocked = Arc::clone(self);
        let active = Arc::clone(self);
        OracleCallbacks {
            check_connection: Some(Arc::new(move |host, port, caller| {
                check.check_connection(host, port, caller)
            })),
            is_explicitly_blocked: Some(Arc::new(move |host| blocked.is_explicitly_blocked(host))),
            has_active_configuration: Some(Arc::new(move || active.has_active_configuration())),
        }
    }
}
