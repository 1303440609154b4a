//! Socket-connect interception: the wrapper installed over the host's
//! low-level connect entry point.
//!
//! The literal IP is checked before the hostname because the IP is the
//! unspoofable description of where the socket actually goes; the
//! hostname is a second chance for targets whose address fails a
//! rule but whose name is explicitly allowed. An explicit block on
//! either identifier is final and wins over everything.

use log::debug;

use airlock_protocol::{CallerId, ConnectionTarget, PolicyViolation};

use crate::context::InterceptionContext;
use crate::host::{ConnectFn, HostEnv, HostFault, RemoteAddress};
use crate::readiness::ThreadReadiness;
use crate::targets::CONNECT_KEY;

/// Status code identifying a policy block for hosts that report connect
/// failures as a scalar rather than an error object.
pub const CONNECT_BLOCKED: i32 = -2;

fn forward(
    env: &dyn HostEnv,
    remote: &dyn RemoteAddress,
    port: i32,
    original: Option<ConnectFn>,
) -> Result<i32, HostFault> {
    match original {
        Some(f) => f(env, remote, port),
        None => Err(HostFault::MissingOriginal(CONNECT_KEY)),
    }
}

/// Read out whatever the runtime knows about the target. The hostname is
/// only attempted once the IP read has succeeded: a successful read
/// proves this thread can marshal strings, and `host_string` may trigger
/// a reverse lookup that is not safe to attempt before that.
fn extract_target(env: &dyn HostEnv, remote: &dyn RemoteAddress, port: i32) -> ConnectionTarget {
    let ip = match remote.ip_string(env) {
        Ok(handle) => match env.get_string(&handle) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("target address unreadable ({e})");
                None
            }
        },
        Err(e) => {
            debug!("no target address available ({e})");
            None
        }
    };
    let hostname = if ip.is_some() {
        match remote.host_string(env) {
            Ok(Some(handle)) => env.get_string(&handle).ok(),
            _ => None,
        }
    } else {
        None
    };
    ConnectionTarget { ip, hostname, port }
}

fn decide(ctx: &InterceptionContext, target: &ConnectionTarget) -> Result<(), HostFault> {
    let (Some(check), Some(explicitly_blocked)) = (
        ctx.bridge.check_connection(),
        ctx.bridge.is_explicitly_blocked(),
    ) else {
        return Ok(());
    };

    // Explicit blocks are final: an allow-list entry for the other
    // identifier must not rescue the attempt.
    let ip_blocked = target
        .ip
        .as_deref()
        .is_some_and(|ip| explicitly_blocked(ip));
    let hostname_blocked = target
        .hostname
        .as_deref()
        .is_some_and(|host| explicitly_blocked(host));
    if ip_blocked || hostname_blocked {
        let found = if hostname_blocked {
            target.hostname.as_deref()
        } else {
            target.ip.as_deref()
        }
        .unwrap_or_default();
        debug!("explicit block on {found}:{}", target.port);
        return match check(found, target.port, CallerId::Agent) {
            Err(violation) => Err(violation.into()),
            // The oracle declined to raise; the block still stands.
            Ok(()) => Err(PolicyViolation::new(found, target.port, CallerId::Agent).into()),
        };
    }

    let mut last_violation: Option<PolicyViolation> = None;
    if let Some(ip) = target.ip.as_deref() {
        match check(ip, target.port, CallerId::Agent) {
            Ok(()) => return Ok(()),
            Err(violation) => last_violation = Some(violation),
        }
    }
    if let Some(host) = target.hostname.as_deref() {
        match check(host, target.port, CallerId::Agent) {
            // An allowed hostname clears the address denial.
            Ok(()) => return Ok(()),
            Err(violation) => last_violation = Some(violation),
        }
    }
    match last_violation {
        Some(violation) => Err(violation.into()),
        None => Ok(()),
    }
}

/// Decide-then-forward wrapper body for the connect target.
pub fn intercept_connect(
    ctx: &InterceptionContext,
    env: &dyn HostEnv,
    remote: &dyn RemoteAddress,
    port: i32,
    original: Option<ConnectFn>,
) -> Result<i32, HostFault> {
    if !ctx.gate.is_ready() || !ctx.bridge.is_registered() {
        return forward(env, remote, port, original);
    }

    let Some(has_configuration) = ctx.bridge.has_active_configuration() else {
        return forward(env, remote, port, original);
    };
    if !has_configuration() {
        if ctx.gate.ensure_thread_ready(env, &ctx.bridge) == ThreadReadiness::NotReady {
            return Err(HostFault::NotReady(CONNECT_KEY));
        }
        return forward(env, remote, port, original);
    }

    let target = extract_target(env, remote, port);
    if target.ip.is_none() && target.hostname.is_none() {
        debug!("no target information available; forwarding connect");
        return forward(env, remote, port, original);
    }

    decide(ctx, &target)?;
    forward(env, remote, port, original)
}
