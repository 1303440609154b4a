//! Load/unload state machine and bind-event dispatch.
//!
//! The host runtime reports every native-method bind here; matched
//! targets have their original entry point recorded and a replacement
//! pointer handed back. The replacements are the `*_entry` shims below,
//! the only place a typed entry point is recovered from a raw address.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use log::{debug, info, warn};

use crate::connect::intercept_connect;
use crate::context::InterceptionContext;
use crate::dns::intercept_resolve;
use crate::host::{HostEnv, HostFault, HostRuntime, HostString, RawOriginal, RemoteAddress};
use crate::readiness::GateConfig;
use crate::targets::{
    match_target, TargetFamily, CONNECT_KEY, RESOLVER4_KEY, RESOLVER6_KEY, TARGETS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Unloaded,
    Loading,
    Active,
}

/// A native-method bind as reported by the host.
#[derive(Debug, Clone, Copy)]
pub struct BindEvent<'a> {
    pub declaring_type: &'a str,
    pub method: &'a str,
    pub signature: &'a str,
    /// The entry point the host was about to bind.
    pub address: RawOriginal,
}

pub struct AgentController {
    state: Mutex<AgentState>,
    ctx: Arc<InterceptionContext>,
}

impl AgentController {
    pub fn load(host: &dyn HostRuntime, debug: bool) -> anyhow::Result<Arc<Self>> {
        Self::load_with_config(host, debug, GateConfig::default())
    }

    /// Load with explicit retry bounds for the readiness waits.
    pub fn load_with_config(
        host: &dyn HostRuntime,
        debug: bool,
        gate: GateConfig,
    ) -> anyhow::Result<Arc<Self>> {
        let controller = Arc::new(Self {
            state: Mutex::new(AgentState::Loading),
            ctx: Arc::new(InterceptionContext::with_config(debug, gate)),
        });
        // Both capabilities or neither: with only one of the two events
        // the agent could intercept binds it can never arm, or arm with
        // nothing intercepted.
        host.enable_bind_events()
            .context("requesting bind-event capability")?;
        host.enable_init_event()
            .context("requesting init-event capability")?;
        crate::publish_context(Arc::clone(&controller.ctx));
        *controller
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = AgentState::Active;
        info!("network interception agent loaded");
        Ok(controller)
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn context(&self) -> &Arc<InterceptionContext> {
        &self.ctx
    }

    /// Bind-event dispatch. Returns the replacement entry point the host
    /// should bind instead, or `None` to leave the binding alone.
    pub fn on_native_bind(&self, event: &BindEvent<'_>) -> Option<RawOriginal> {
        if self.state() != AgentState::Active {
            return None;
        }
        let target = match_target(event.declaring_type, event.method, event.signature)?;
        self.ctx.registry.store(target.key, event.address);
        debug!("replacing binding for {}", target.key);
        Some(match target.family {
            TargetFamily::Dns if target.key == RESOLVER4_KEY => {
                RawOriginal::from_resolve(resolve4_entry)
            }
            TargetFamily::Dns => RawOriginal::from_resolve(resolve6_entry),
            TargetFamily::Connect => RawOriginal::from_connect(connect_entry),
        })
    }

    /// Host-initialization event: open the readiness gate, then audit
    /// which targets were actually bound before this point.
    pub fn on_host_initialized(&self, env: &dyn HostEnv) {
        self.ctx.gate.mark_ready(env, &self.ctx.bridge);
        for target in TARGETS {
            if self.ctx.registry.lookup(target.key).is_none() {
                warn!(
                    "{} was never bound; calls through it will not be intercepted",
                    target.key
                );
            }
        }
    }

    /// Release every held reference: oracle handles, pinned strings, the
    /// process-global context slot.
    pub fn unload(&self) {
        *self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = AgentState::Unloaded;
        self.ctx.bridge.clear();
        crate::clear_context();
        info!("network interception agent unloaded");
    }
}

fn resolve_entry(
    env: &dyn HostEnv,
    hostname: Option<&HostString>,
    key: &'static str,
) -> Result<Vec<IpAddr>, HostFault> {
    let Some(ctx) = crate::active_context() else {
        // Unloaded mid-call; nothing left to forward through.
        return Err(HostFault::MissingOriginal(key));
    };
    // Registry entries under the resolver keys are only ever stored from
    // DNS-family bind events, so the recovered shape is the bound one.
    let original = ctx.registry.lookup(key).map(|raw| unsafe { raw.as_resolve() });
    intercept_resolve(&ctx, env, hostname, original, key)
}

fn resolve4_entry(
    env: &dyn HostEnv,
    hostname: Option<&HostString>,
) -> Result<Vec<IpAddr>, HostFault> {
    resolve_entry(env, hostname, RESOLVER4_KEY)
}

fn resolve6_entry(
    env: &dyn HostEnv,
    hostname: Option<&HostString>,
) -> Result<Vec<IpAddr>, HostFault> {
    resolve_entry(env, hostname, RESOLVER6_KEY)
}

fn connect_entry(
    env: &dyn HostEnv,
    remote: &dyn RemoteAddress,
    port: i32,
) -> Result<i32, HostFault> {
    let Some(ctx) = crate::active_context() else {
        return Err(HostFault::MissingOriginal(CONNECT_KEY));
    };
    let original = ctx
        .registry
        .lookup(CONNECT_KEY)
        .map(|raw| unsafe { raw.as_connect() });
    intercept_connect(&ctx, env, remote, port, original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{counting_connect, counting_resolve, FakeHost};

    // Load/unload manipulate the process-global context slot.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn resolver_bind() -> BindEvent<'static> {
        BindEvent {
            declaring_type: "net.Inet4Resolver",
            method: "lookupAllHostAddr",
            signature: "(string) -> addr[]",
            address: RawOriginal::from_resolve(counting_resolve),
        }
    }

    #[test]
    fn test_load_fails_atomically_when_a_capability_is_refused() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut host = FakeHost::ready();
        host.refuse_init_event = true;
        assert!(AgentController::load(&host, false).is_err());
    }

    #[test]
    fn test_bind_dispatch_stores_original_and_returns_replacement() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let controller = AgentController::load(&FakeHost::ready(), false).unwrap();
        assert_eq!(controller.state(), AgentState::Active);

        let replacement = controller.on_native_bind(&resolver_bind());
        assert!(replacement.is_some());
        assert!(controller.context().registry.lookup(RESOLVER4_KEY).is_some());
        controller.unload();
    }

    #[test]
    fn test_unrelated_bindings_are_left_alone() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let controller = AgentController::load(&FakeHost::ready(), false).unwrap();
        let event = BindEvent {
            declaring_type: "io.FileChannel",
            method: "open0",
            signature: "(string) -> int",
            address: RawOriginal::from_resolve(counting_resolve),
        };
        assert!(controller.on_native_bind(&event).is_none());
        assert!(controller.context().registry.lookup("io.FileChannel.open0").is_none());
        controller.unload();
    }

    #[test]
    fn test_each_target_gets_its_own_replacement() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let controller = AgentController::load(&FakeHost::ready(), false).unwrap();
        let r4 = controller.on_native_bind(&resolver_bind()).unwrap();
        let r6 = controller
            .on_native_bind(&BindEvent {
                declaring_type: "net.Inet6Resolver",
                method: "lookupAllHostAddr",
                signature: "(string) -> addr[]",
                address: RawOriginal::from_resolve(counting_resolve),
            })
            .unwrap();
        let conn = controller
            .on_native_bind(&BindEvent {
                declaring_type: "nio.NetChannel",
                method: "connect0",
                signature: "(fd, addr, int) -> int",
                address: RawOriginal::from_connect(counting_connect),
            })
            .unwrap();
        assert_ne!(r4, r6);
        assert_ne!(r4, conn);
        assert_ne!(r6, conn);
        controller.unload();
    }

    #[test]
    fn test_unloaded_controller_ignores_binds() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let controller = AgentController::load(&FakeHost::ready(), false).unwrap();
        controller.unload();
        assert_eq!(controller.state(), AgentState::Unloaded);
        assert!(controller.on_native_bind(&resolver_bind()).is_none());
    }
}
