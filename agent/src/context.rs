//! The process-wide interception context.
//!
//! The interception point is a process-wide function-table rewrite, so its
//! state is necessarily global — but it is grouped here into one
//! explicitly-lifecycled unit, constructed at load and torn down at
//! unload, instead of free-standing statics.

use crate::bridge::DecisionBridge;
use crate::readiness::{GateConfig, ReadinessGate};
use crate::registry::OriginalRegistry;

pub struct InterceptionContext {
    pub registry: OriginalRegistry,
    pub bridge: DecisionBridge,
    pub gate: ReadinessGate,
    /// Verbose diagnostics requested via the load options.
    pub debug: bool,
}

impl InterceptionContext {
    pub fn new(debug: bool) -> Self {
        Self::with_config(debug, GateConfig::default())
    }

    pub fn with_config(debug: bool, gate: GateConfig) -> Self {
        Self {
            registry: OriginalRegistry::new(),
            bridge: DecisionBridge::new(),
            gate: ReadinessGate::new(gate),
            debug,
        }
    }
}
