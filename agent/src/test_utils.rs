//! Shared fakes for unit tests: a host runtime whose string subsystem can
//! lag, a connection target, call-counted originals, and an oracle
//! wrapper that counts policy consultations.

use std::cell::Cell;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use airlock_policy::RulesStore;
use airlock_protocol::OracleCallbacks;

use crate::context::InterceptionContext;
use crate::host::{
    CapabilityError, HostEnv, HostFault, HostRuntime, HostString, RemoteAddress, StringsError,
};
use crate::readiness::{GateConfig, RetryPolicy};

/// Fake host runtime. `string_failures` string operations fail with
/// `NotReady` before the subsystem "comes up"; `usize::MAX` never
/// recovers.
pub struct FakeHost {
    string_failures: Mutex<usize>,
    pub refuse_bind_events: bool,
    pub refuse_init_event: bool,
}

impl FakeHost {
    pub fn ready() -> Self {
        Self::failing_string_ops(0)
    }

    pub fn failing_string_ops(failures: usize) -> Self {
        Self {
            string_failures: Mutex::new(failures),
            refuse_bind_events: false,
            refuse_init_event: false,
        }
    }

    fn consume_failure(&self) -> Result<(), StringsError> {
        let mut remaining = self.string_failures.lock().unwrap();
        if *remaining > 0 {
            if *remaining != usize::MAX {
                *remaining -= 1;
            }
            return Err(StringsError::NotReady);
        }
        Ok(())
    }
}

impl HostEnv for FakeHost {
    fn new_string(&self, value: &str) -> Result<HostString, StringsError> {
        self.consume_failure()?;
        Ok(HostString::new(value))
    }

    fn get_string(&self, handle: &HostString) -> Result<String, StringsError> {
        self.consume_failure()?;
        Ok(handle.backing().to_string())
    }
}

impl HostRuntime for FakeHost {
    fn enable_bind_events(&self) -> Result<(), CapabilityError> {
        if self.refuse_bind_events {
            return Err(CapabilityError("bind events refused".into()));
        }
        Ok(())
    }

    fn enable_init_event(&self) -> Result<(), CapabilityError> {
        if self.refuse_init_event {
            return Err(CapabilityError("init event refused".into()));
        }
        Ok(())
    }
}

/// Fake connection target.
pub struct FakeRemote {
    pub ip: Option<&'static str>,
    pub hostname: Option<&'static str>,
}

impl RemoteAddress for FakeRemote {
    fn ip_string(&self, _env: &dyn HostEnv) -> Result<HostString, StringsError> {
        self.ip
            .map(HostString::new)
            .ok_or(StringsError::InvalidHandle)
    }

    fn host_string(&self, _env: &dyn HostEnv) -> Result<Option<HostString>, StringsError> {
        Ok(self.hostname.map(HostString::new))
    }
}

thread_local! {
    static RESOLVE_CALLS: Cell<usize> = const { Cell::new(0) };
    static CONNECT_CALLS: Cell<usize> = const { Cell::new(0) };
}

pub fn reset_original_calls() {
    RESOLVE_CALLS.with(|c| c.set(0));
    CONNECT_CALLS.with(|c| c.set(0));
}

pub fn resolve_calls() -> usize {
    RESOLVE_CALLS.with(Cell::get)
}

pub fn connect_calls() -> usize {
    CONNECT_CALLS.with(Cell::get)
}

/// Stand-in for the host's original resolver binding.
pub fn counting_resolve(
    _env: &dyn HostEnv,
    _hostname: Option<&HostString>,
) -> Result<Vec<IpAddr>, HostFault> {
    RESOLVE_CALLS.with(|c| c.set(c.get() + 1));
    Ok(vec![IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))])
}

/// Stand-in for the host's original connect binding.
pub fn counting_connect(
    _env: &dyn HostEnv,
    _remote: &dyn RemoteAddress,
    _port: i32,
) -> Result<i32, HostFault> {
    CONNECT_CALLS.with(|c| c.set(c.get() + 1));
    Ok(0)
}

/// Oracle handles backed by a rules store, with `check_connection`
/// consultations counted.
pub fn counting_oracle(store: &Arc<RulesStore>) -> (OracleCallbacks, Arc<AtomicUsize>) {
    let mut callbacks = store.oracle();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let inner = callbacks.check_connection.take().expect("store oracle is complete");
    callbacks.check_connection = Some(Arc::new(move |host, port, caller| {
        counter.fetch_add(1, Ordering::SeqCst);
        inner(host, port, caller)
    }));
    (callbacks, count)
}

fn test_gate_config() -> GateConfig {
    GateConfig {
        init_retry: RetryPolicy::for_tests(),
        thread_retry: RetryPolicy::for_tests(),
    }
}

/// Context with test-sized retry bounds, gate still closed.
pub fn test_context() -> InterceptionContext {
    InterceptionContext::with_config(false, test_gate_config())
}

/// Context with the oracle registered and the gate open.
pub fn ready_context(callbacks: OracleCallbacks) -> InterceptionContext {
    let ctx = test_context();
    assert!(ctx.bridge.register(callbacks));
    ctx.gate.mark_ready(&FakeHost::ready(), &ctx.bridge);
    ctx
}
