//! DNS interception: the wrapper installed over the host's
//! address-resolution entry points.
//!
//! Resolution is checked as a connection to the hostname with the
//! designated DNS port so the oracle can tell lookups apart from socket
//! connects. Before readiness, or while no policy configuration is
//! active, lookups pass straight through.

use std::net::IpAddr;

use log::debug;

use airlock_protocol::CallerId;

use crate::context::InterceptionContext;
use crate::host::{HostEnv, HostFault, HostString, ResolveHostFn};
use crate::readiness::ThreadReadiness;

/// Port value marking a check as a name lookup rather than a connect.
pub const DNS_PORT: i32 = -1;

fn forward(
    env: &dyn HostEnv,
    hostname: Option<&HostString>,
    original: Option<ResolveHostFn>,
    key: &'static str,
) -> Result<Vec<IpAddr>, HostFault> {
    match original {
        Some(f) => f(env, hostname),
        None => Err(HostFault::MissingOriginal(key)),
    }
}

/// Decide-then-forward wrapper body shared by the IPv4 and IPv6
/// resolver targets. `key` names the intercepted target for diagnostics
/// and for the missing-original fault.
pub fn intercept_resolve(
    ctx: &InterceptionContext,
    env: &dyn HostEnv,
    hostname: Option<&HostString>,
    original: Option<ResolveHostFn>,
    key: &'static str,
) -> Result<Vec<IpAddr>, HostFault> {
    // Startup window: nothing to consult yet, fail open.
    if !ctx.gate.is_ready() || !ctx.bridge.is_registered() {
        return forward(env, hostname, original, key);
    }

    // Degenerate lookup with no name; the host resolves its defaults.
    let Some(handle) = hostname else {
        return forward(env, hostname, original, key);
    };

    let (Some(has_configuration), Some(check)) = (
        ctx.bridge.has_active_configuration(),
        ctx.bridge.check_connection(),
    ) else {
        return forward(env, hostname, original, key);
    };

    if !has_configuration() {
        // No rules active (between tests). Still verify this thread can
        // marshal strings before touching the handle: a lagging thread
        // must surface a transient error, never crash or silently allow.
        if ctx.gate.ensure_thread_ready(env, &ctx.bridge) == ThreadReadiness::NotReady {
            return Err(HostFault::NotReady(key));
        }
        return forward(env, hostname, original, key);
    }

    let host = match env.get_string(handle) {
        Ok(host) => host,
        Err(e) => {
            debug!("hostname unreadable during resolution ({e}); forwarding");
            return forward(env, hostname, original, key);
        }
    };

    check(&host, DNS_PORT, CallerId::Dns)?;
    debug!("resolution of {host} allowed");
    forward(env, hostname, original, key)
}
