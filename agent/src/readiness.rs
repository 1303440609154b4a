//! Readiness gate.
//!
//! Interception must not call into managed code, or marshal strings,
//! before the host runtime finishes initializing — doing so recurses into
//! half-built subsystems. The gate is a one-way NOT_READY -> READY flag
//! flipped by the host's initialization event, plus a per-thread probe
//! for threads created after that event whose own subsystem setup may
//! still lag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};

use crate::bridge::DecisionBridge;
use crate::host::HostEnv;

/// Bounded retry loop shape. Exposed as configuration so tests can
/// shrink the waits to nothing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(5, Duration::from_millis(1))
    }
}

/// Retry bounds for the two waits the gate performs.
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Pinning the caller constants right after the init event
    /// (~500ms worst case).
    pub init_retry: RetryPolicy,
    /// Per-thread string probe on a wrapper's calling thread
    /// (~5s worst case; new worker threads can lag well behind).
    pub thread_retry: RetryPolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            init_retry: RetryPolicy::new(50, Duration::from_millis(10)),
            thread_retry: RetryPolicy::new(100, Duration::from_millis(50)),
        }
    }
}

/// Outcome of a per-thread probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadReadiness {
    Ready,
    /// Recoverable: the caller signals a transient failure, never
    /// silently allows or crashes.
    NotReady,
}

pub struct ReadinessGate {
    ready: AtomicBool,
    transitioning: AtomicBool,
    degraded: AtomicBool,
    config: GateConfig,
}

impl ReadinessGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            ready: AtomicBool::new(false),
            transitioning: AtomicBool::new(false),
            degraded: AtomicBool::new(false),
            config,
        }
    }

    /// Lock-free hot-path read. Until this is true every wrapper passes
    /// calls straight through.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// True when the init-time constant pinning exhausted its retries and
    /// the gate opened anyway. String operations may still fail and are
    /// handled per call, not treated as fatal.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Host-initialization transition. One-way; the first caller performs
    /// it, later calls are no-ops.
    pub fn mark_ready(&self, env: &dyn HostEnv, bridge: &DecisionBridge) {
        if self.transitioning.swap(true, Ordering::SeqCst) {
            return;
        }
        if !bridge.init_constants(env, self.config.init_retry) {
            warn!(
                "caller constants unavailable after {} attempts; continuing in degraded mode",
                self.config.init_retry.attempts
            );
            self.degraded.store(true, Ordering::Release);
        }
        self.ready.store(true, Ordering::Release);
        debug!("host initialization complete; interception armed");
    }

    /// Probe whether the calling thread can perform string operations,
    /// by reading back a known-good pinned string with bounded retries.
    /// Threads spawned after the init event may not have finished their
    /// own subsystem setup even though the process-wide flag is set.
    pub fn ensure_thread_ready(
        &self,
        env: &dyn HostEnv,
        bridge: &DecisionBridge,
    ) -> ThreadReadiness {
        let Some(probe) = bridge.caller_agent() else {
            // Degraded mode: nothing safe to probe with.
            return ThreadReadiness::NotReady;
        };
        for attempt in 0..self.config.thread_retry.attempts {
            if attempt > 0 {
                std::thread::sleep(self.config.thread_retry.backoff);
            }
            match env.get_string(&probe) {
                Ok(_) => {
                    if attempt > 0 {
                        debug!("thread string subsystem ready after {} attempts", attempt + 1);
                    }
                    return ThreadReadiness::Ready;
                }
                Err(crate::host::StringsError::NotReady) => continue,
                Err(e) => {
                    debug!("thread readiness probe failed: {}", e);
                    return ThreadReadiness::NotReady;
                }
            }
        }
        ThreadReadiness::NotReady
    }
}
