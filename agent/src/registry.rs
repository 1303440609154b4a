//! Original-pointer registry.
//!
//! Maps a target method's stable key to the native entry point the host
//! originally bound, so wrappers can forward after a policy check.
//! Write-once-per-key in practice (the host binds each method once);
//! `store` is an idempotent upsert regardless. Absence is the only
//! "not found" signal — no placeholder pointers.

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::host::RawOriginal;

#[derive(Default)]
pub struct OriginalRegistry {
    entries: Mutex<HashMap<&'static str, RawOriginal>>,
}

impl OriginalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the original entry point for `key`.
    pub fn store(&self, key: &'static str, original: RawOriginal) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, original);
        debug!("stored original entry point for {}", key);
    }

    /// The original entry point for `key`, if one was ever captured.
    pub fn lookup(&self, key: &str) -> Option<RawOriginal> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEnv, HostFault, HostString};
    use std::net::IpAddr;

    fn noop_resolve(
        _env: &dyn HostEnv,
        _hostname: Option<&HostString>,
    ) -> Result<Vec<IpAddr>, HostFault> {
        Ok(Vec::new())
    }

    #[test]
    fn test_lookup_of_unstored_key_is_absent() {
        let registry = OriginalRegistry::new();
        assert_eq!(registry.lookup("net.Inet4Resolver.lookupAllHostAddr"), None);
    }

    #[test]
    fn test_store_then_lookup_round_trips_the_address() {
        let registry = OriginalRegistry::new();
        let original = RawOriginal::from_resolve(noop_resolve);
        registry.store("net.Inet4Resolver.lookupAllHostAddr", original);
        assert_eq!(
            registry.lookup("net.Inet4Resolver.lookupAllHostAddr"),
            Some(original)
        );
    }

    #[test]
    fn test_store_is_idempotent_per_key() {
        let registry = OriginalRegistry::new();
        let original = RawOriginal::from_resolve(noop_resolve);
        registry.store("nio.NetChannel.connect0", original);
        registry.store("nio.NetChannel.connect0", original);
        assert_eq!(registry.lookup("nio.NetChannel.connect0"), Some(original));
    }
}
