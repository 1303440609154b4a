//! The decision protocol between the interception layer and the external
//! policy oracle.
//!
//! The oracle lives on the managed side of the runtime boundary. At
//! registration time it hands the agent a set of callable handles
//! ([`OracleCallbacks`]); the agent caches them and consults them on every
//! intercepted resolution or connection attempt. A blocked attempt is
//! reported as a [`PolicyViolation`], which the agent surfaces through the
//! host's normal error propagation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which interception path raised a policy check. Carried on every
/// violation so diagnostics and test assertions can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallerId {
    /// Socket-connect interception.
    Agent,
    /// DNS-resolution interception.
    Dns,
}

impl CallerId {
    /// The constant string payload passed to `check_connection`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerId::Agent => "agent-path",
            CallerId::Dns => "dns-path",
        }
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection or resolution attempt the active policy does not permit.
///
/// `port` is `-1` for DNS-stage checks, where no port is known yet.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("network request to {host}:{port} blocked ({caller})")]
pub struct PolicyViolation {
    pub host: String,
    pub port: i32,
    pub caller: CallerId,
}

impl PolicyViolation {
    pub fn new(host: impl Into<String>, port: i32, caller: CallerId) -> Self {
        Self {
            host: host.into(),
            port,
            caller,
        }
    }
}

/// Transient, per-call record of a connection target as the connect
/// interceptor saw it. The hostname is only present when the runtime
/// already knew it (or a reverse lookup produced one).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub port: i32,
}

/// `check_connection(host, port, caller)`: returns `Err` when the attempt
/// is blocked, `Ok(())` when it may proceed (including when no
/// configuration is active).
pub type CheckConnectionFn =
    Arc<dyn Fn(&str, i32, CallerId) -> Result<(), PolicyViolation> + Send + Sync>;

/// `is_explicitly_blocked(host)`: whether the host appears in the explicit
/// block list, independent of any allow-list membership.
pub type IsExplicitlyBlockedFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// `has_active_configuration()`: whether any policy is currently in force.
pub type HasActiveConfigurationFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// The handles the policy oracle supplies when it registers with the
/// agent. Fields are individually optional because resolution of any one
/// of them can fail on the managed side; the agent's bridge treats the
/// set as all-or-nothing and falls back to running unintercepted when a
/// handle is missing.
#[derive(Clone, Default)]
pub struct OracleCallbacks {
    pub check_connection: Option<CheckConnectionFn>,
    pub is_explicitly_blocked: Option<IsExplicitlyBlockedFn>,
    pub has_active_configuration: Option<HasActiveConfigurationFn>,
}

impl OracleCallbacks {
    /// True when every decision handle resolved.
    pub fn is_complete(&self) -> bool {
        self.check_connection.is_some()
            && self.is_explicitly_blocked.is_some()
            && self.has_active_configuration.is_some()
    }
}

impl fmt::Debug for OracleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleCallbacks")
            .field("check_connection", &self.check_connection.is_some())
            .field("is_explicitly_blocked", &self.is_explicitly_blocked.is_some())
            .field(
                "has_active_configuration",
                &self.has_active_configuration.is_some(),
            )
            .finish()
    }
}
