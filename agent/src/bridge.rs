//! Decision bridge: the cached link to the external policy oracle.
//!
//! The oracle registers once, from the managed side, during its own
//! initialization. The bridge caches its three decision handles so
//! wrappers never pay a lookup on the hot path, plus the two pinned
//! caller-identity strings every check carries. Registration is
//! all-or-nothing: a partial handle set rolls back to "unregistered" and
//! the agent runs unintercepted rather than consult an inconsistent
//! oracle. The lock is held only for field access, never across a call
//! into the oracle.

use std::sync::Mutex;

use log::{info, warn};

use airlock_protocol::{
    CallerId, CheckConnectionFn, HasActiveConfigurationFn, IsExplicitlyBlockedFn, OracleCallbacks,
};

use crate::host::{HostEnv, HostString};
use crate::readiness::RetryPolicy;

/// The complete handle set. Constructed only when every callback
/// resolved, so a registered bridge can never be half-populated.
#[derive(Clone)]
struct OracleVTable {
    check_connection: CheckConnectionFn,
    is_explicitly_blocked: IsExplicitlyBlockedFn,
    has_active_configuration: HasActiveConfigurationFn,
}

#[derive(Default)]
struct BridgeState {
    oracle: Option<OracleVTable>,
    caller_agent: Option<HostString>,
    caller_dns: Option<HostString>,
}

#[derive(Default)]
pub struct DecisionBridge {
    state: Mutex<BridgeState>,
}

impl DecisionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the oracle's decision handles. Replaces any previous set
    /// wholesale, so re-registration is idempotent and leaves no stale
    /// handles. Returns false (and stays unregistered) when any handle
    /// is missing.
    pub fn register(&self, callbacks: OracleCallbacks) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let OracleCallbacks {
            check_connection: Some(check_connection),
            is_explicitly_blocked: Some(is_explicitly_blocked),
            has_active_configuration: Some(has_active_configuration),
        } = callbacks
        else {
            warn!("policy oracle registration incomplete; running unintercepted");
            state.oracle = None;
            return false;
        };
        state.oracle = Some(OracleVTable {
            check_connection,
            is_explicitly_blocked,
            has_active_configuration,
        });
        info!("policy oracle registered; network interception enabled");
        true
    }

    /// Drop every cached handle and pinned string.
    pub fn clear(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = BridgeState::default();
    }

    pub fn is_registered(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .oracle
            .is_some()
    }

    pub fn check_connection(&self) -> Option<CheckConnectionFn> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.oracle.as_ref().map(|o| o.check_connection.clone())
    }

    pub fn is_explicitly_blocked(&self) -> Option<IsExplicitlyBlockedFn> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.oracle.as_ref().map(|o| o.is_explicitly_blocked.clone())
    }

    pub fn has_active_configuration(&self) -> Option<HasActiveConfigurationFn> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .oracle
            .as_ref()
            .map(|o| o.has_active_configuration.clone())
    }

    /// Create and pin the two caller-identity constants. Only called once
    /// the host has signalled full initialization; string construction
    /// before that point can fail outright. Retries cover the tail of the
    /// startup window where the signal has fired but the string subsystem
    /// still lags.
    pub fn init_constants(&self, env: &dyn HostEnv, retry: RetryPolicy) -> bool {
        for attempt in 0..retry.attempts {
            if attempt > 0 {
                std::thread::sleep(retry.backoff);
            }
            let agent = env.new_string(CallerId::Agent.as_str());
            let dns = env.new_string(CallerId::Dns.as_str());
            if let (Ok(agent), Ok(dns)) = (agent, dns) {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                state.caller_agent = Some(agent);
                state.caller_dns = Some(dns);
                return true;
            }
        }
        false
    }

    /// The pinned "agent-path" constant, also the probe string for
    /// per-thread readiness checks.
    pub fn caller_agent(&self) -> Option<HostString> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .caller_agent
            .clone()
    }

    pub fn caller_dns(&self) -> Option<HostString> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .caller_dns
            .clone()
    }
}
