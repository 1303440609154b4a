//! Test-time network interception agent.
//!
//! Loaded into a managed host runtime before user code runs, the agent
//! observes native-method bind events and substitutes wrappers for the
//! host's address-resolution and socket-connect entry points. Each
//! wrapper consults an externally registered policy oracle and either
//! forwards to the captured original or raises a policy violation
//! through the host's normal error channel. Until the host signals full
//! initialization, and whenever no policy configuration is active,
//! traffic passes through untouched.

pub mod bridge;
pub mod connect;
pub mod context;
pub mod controller;
pub mod dns;
pub mod host;
pub mod readiness;
pub mod registry;
pub mod targets;
pub mod urlfilter;

#[cfg(test)]
mod test_utils;

pub use connect::CONNECT_BLOCKED;
pub use context::InterceptionContext;
pub use controller::{AgentController, AgentState, BindEvent};
pub use dns::DNS_PORT;
pub use host::{HostEnv, HostFault, HostRuntime, HostString, RawOriginal, RemoteAddress};

use std::sync::{Arc, RwLock};

use airlock_protocol::OracleCallbacks;

/// The one process-global slot: populated at load, cleared at unload.
/// Entry-point shims reach interception state through here because the
/// host calls them with no context argument.
static CONTEXT: RwLock<Option<Arc<InterceptionContext>>> = RwLock::new(None);

pub(crate) fn active_context() -> Option<Arc<InterceptionContext>> {
    CONTEXT.read().unwrap_or_else(|e| e.into_inner()).clone()
}

pub(crate) fn publish_context(ctx: Arc<InterceptionContext>) {
    *CONTEXT.write().unwrap_or_else(|e| e.into_inner()) = Some(ctx);
}

pub(crate) fn clear_context() {
    *CONTEXT.write().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Load entry point. `options` is the host's comma-separated option
/// string; `debug` raises the log filter for verbose diagnostics on
/// standard error.
pub fn agent_on_load(host: &dyn HostRuntime, options: &str) -> anyhow::Result<Arc<AgentController>> {
    let debug = options.split(',').any(|opt| opt.trim() == "debug");
    init_logging(debug);
    AgentController::load(host, debug)
}

/// Unload entry point: releases oracle handles, pinned strings, and the
/// global context.
pub fn agent_on_unload(controller: &AgentController) {
    controller.unload();
}

/// The single registration call from the managed side. Returns whether
/// the oracle was accepted; an incomplete callback set, or a call before
/// the agent is loaded, leaves interception disabled.
pub fn register_policy_oracle(callbacks: OracleCallbacks) -> bool {
    match active_context() {
        Some(ctx) => ctx.bridge.register(callbacks),
        None => {
            log::warn!("policy oracle registration before agent load; ignored");
            false
        }
    }
}

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // The embedding process may already own the global logger.
    let _ = builder.try_init();
}
