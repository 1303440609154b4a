//! Request filter for hosts whose URL-loading stack is interposable
//! directly, without a native-method rebind.
//!
//! Same rule semantics as the socket path, applied where requests are
//! loaded: a blocked host fails the request with a policy violation
//! instead of letting it reach the network. Registration installs a
//! rule set (optionally with an embedder callback for unlisted hosts);
//! unregistering restores pass-through.

use std::sync::Mutex;

use log::{debug, info};

use airlock_policy::{CompiledRules, HostDecider, NetworkRules};
use airlock_protocol::{CallerId, PolicyViolation};

#[derive(Clone)]
struct ActiveFilter {
    rules: CompiledRules,
    decider: Option<HostDecider>,
}

#[derive(Default)]
pub struct UrlFilter {
    state: Mutex<Option<ActiveFilter>>,
}

impl UrlFilter {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Install a rule set, replacing any previous configuration.
    pub fn register(&self, rules: &NetworkRules, decider: Option<HostDecider>) {
        let compiled = rules.compile();
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(ActiveFilter {
            rules: compiled,
            decider,
        });
        info!("request filter registered");
    }

    pub fn unregister(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = None;
        info!("request filter unregistered");
    }

    pub fn is_registered(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Gate a request load. An unregistered filter passes everything.
    /// The active configuration is cloned out so the embedder callback
    /// runs outside the lock.
    pub fn check_request(&self, host: &str, port: i32) -> Result<(), PolicyViolation> {
        let active = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(active) = active else {
            return Ok(());
        };
        let decision = active.rules.decide_with(host, active.decider.as_ref());
        if decision.is_blocked() {
            debug!(
                "request to {host}:{port} blocked{}",
                decision
                    .matched_pattern
                    .as_deref()
                    .map(|p| format!(" (pattern {p})"))
                    .unwrap_or_default()
            );
            return Err(PolicyViolation::new(host, port, CallerId::Agent));
        }
        Ok(())
    }
}

static FILTER: UrlFilter = UrlFilter::new();

/// The process-wide filter instance the URL-loading hook consults.
pub fn global() -> &'static UrlFilter {
    &FILTER
}
