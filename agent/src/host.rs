//! Host-runtime seam.
//!
//! The interception layer sits on the boundary between native code and a
//! managed execution engine. Everything it needs from the host — string
//! marshalling, capability acquisition, the shape of a connection target —
//! is expressed through the traits here, so the decision logic can be
//! exercised against fakes and the real binding glue stays thin.

use std::net::IpAddr;

use thiserror::Error;

use airlock_protocol::PolicyViolation;

/// Opaque handle to a string pinned in the host runtime.
///
/// Contents are only reachable through [`HostEnv::get_string`]; reads can
/// fail while the host's encoding subsystem is still initializing, which
/// is exactly the window the readiness gate guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostString(std::sync::Arc<str>);

impl HostString {
    pub fn new(value: impl Into<std::sync::Arc<str>>) -> Self {
        Self(value.into())
    }

    /// Raw backing text. For `HostEnv` implementations servicing
    /// `get_string`; interception code must go through the env so the
    /// readiness contract is honored.
    pub fn backing(&self) -> &str {
        &self.0
    }
}

/// String-subsystem failures. `NotReady` is the startup race; everything
/// else is a handle-level problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StringsError {
    #[error("host string subsystem not ready")]
    NotReady,
    #[error("invalid host string handle")]
    InvalidHandle,
}

/// Per-call host services available to a wrapper on any thread.
pub trait HostEnv: Send + Sync {
    /// Create and pin a string in the host.
    fn new_string(&self, value: &str) -> Result<HostString, StringsError>;

    /// Read a pinned string back out.
    fn get_string(&self, handle: &HostString) -> Result<String, StringsError>;
}

/// A capability or event-registration request the host refused.
#[derive(Debug, Error)]
#[error("host capability unavailable: {0}")]
pub struct CapabilityError(pub String);

/// Process-level host services requested once, at load time.
///
/// The host drives the controller in return: it reports every
/// native-method bind through `AgentController::on_native_bind` and fires
/// `on_host_initialized` once it considers itself fully initialized.
pub trait HostRuntime: HostEnv {
    /// Ask to observe native-method bind events.
    fn enable_bind_events(&self) -> Result<(), CapabilityError>;

    /// Ask for the full-initialization lifecycle event.
    fn enable_init_event(&self) -> Result<(), CapabilityError>;
}

/// Runtime-native representation of a connect target.
pub trait RemoteAddress {
    /// The literal address string. Never performs a lookup.
    fn ip_string(&self, env: &dyn HostEnv) -> Result<HostString, StringsError>;

    /// The hostname, when the runtime knows one. May perform a reverse
    /// lookup, so callers only invoke this once string readiness has been
    /// demonstrated by a successful `ip_string` read.
    fn host_string(&self, env: &dyn HostEnv) -> Result<Option<HostString>, StringsError>;
}

/// Errors surfaced to the host's normal error-propagation channel.
#[derive(Debug, Error)]
pub enum HostFault {
    /// The active policy denied the attempt. Expected; must propagate
    /// unmodified to the original caller.
    #[error(transparent)]
    Violation(#[from] PolicyViolation),

    /// Per-thread host subsystems were not ready after the readiness
    /// window closed. Transient, but surfaced rather than swallowed:
    /// forwarding would hit the same subsystem and crash deeper.
    #[error("host not ready: {0}")]
    NotReady(&'static str),

    /// The original entry point for an intercepted method was never
    /// captured. A configuration error, deliberately distinct from a
    /// policy violation so test assertions can tell them apart.
    #[error("original entry point missing for {0}")]
    MissingOriginal(&'static str),
}

/// Signature of the host's address-resolution entry point (and of the
/// wrapper that replaces it). `None` hostname is a degenerate lookup the
/// host resolves to its own defaults.
pub type ResolveHostFn =
    fn(&dyn HostEnv, Option<&HostString>) -> Result<Vec<IpAddr>, HostFault>;

/// Signature of the host's low-level connect entry point. The returned
/// status is the host's own (0 = connected, negative = host-defined).
pub type ConnectFn = fn(&dyn HostEnv, &dyn RemoteAddress, i32) -> Result<i32, HostFault>;

/// The function address the host runtime would have bound absent
/// interception, held as a bare address so the registry stays signature
/// agnostic. Recovering a typed entry point is confined to the
/// controller's dispatch shims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawOriginal(usize);

impl RawOriginal {
    pub fn from_resolve(f: ResolveHostFn) -> Self {
        Self(f as usize)
    }

    pub fn from_connect(f: ConnectFn) -> Self {
        Self(f as usize)
    }

    /// # Safety
    /// The address must have been produced by [`RawOriginal::from_resolve`]
    /// (or be a host binding with the same shape).
    pub unsafe fn as_resolve(self) -> ResolveHostFn {
        std::mem::transmute(self.0)
    }

    /// # Safety
    /// The address must have been produced by [`RawOriginal::from_connect`]
    /// (or be a host binding with the same shape).
    pub unsafe fn as_connect(self) -> ConnectFn {
        std::mem::transmute(self.0)
    }
}
