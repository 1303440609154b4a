//! The compiled-in table of native methods the agent intercepts.

/// Which wrapper family handles a matched target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFamily {
    /// Address-resolution entry points.
    Dns,
    /// The low-level connect entry point all socket APIs funnel through.
    Connect,
}

/// One row of the target table: the identity of a host-runtime native
/// method and the family of wrapper that replaces it.
#[derive(Debug, Clone, Copy)]
pub struct TargetDescriptor {
    pub declaring_type: &'static str,
    pub method: &'static str,
    pub signature: &'static str,
    /// Stable registry key, `declaring_type.method`.
    pub key: &'static str,
    pub family: TargetFamily,
}

pub const RESOLVER4_KEY: &str = "net.Inet4Resolver.lookupAllHostAddr";
pub const RESOLVER6_KEY: &str = "net.Inet6Resolver.lookupAllHostAddr";
pub const CONNECT_KEY: &str = "nio.NetChannel.connect0";

/// Every native method the agent watches for at bind time. Immutable;
/// the registry can never grow past this table.
pub const TARGETS: &[TargetDescriptor] = &[
    TargetDescriptor {
        declaring_type: "net.Inet4Resolver",
        method: "lookupAllHostAddr",
        signature: "(string) -> addr[]",
        key: RESOLVER4_KEY,
        family: TargetFamily::Dns,
    },
    TargetDescriptor {
        declaring_type: "net.Inet6Resolver",
        method: "lookupAllHostAddr",
        signature: "(string) -> addr[]",
        key: RESOLVER6_KEY,
        family: TargetFamily::Dns,
    },
    TargetDescriptor {
        declaring_type: "nio.NetChannel",
        method: "connect0",
        signature: "(fd, addr, int) -> int",
        key: CONNECT_KEY,
        family: TargetFamily::Connect,
    },
];

/// Match a bound method against the target table.
pub fn match_target(
    declaring_type: &str,
    method: &str,
    signature: &str,
) -> Option<&'static TargetDescriptor> {
    TARGETS.iter().find(|t| {
        t.declaring_type == declaring_type && t.method == method && t.signature == signature
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_and_connect_targets_match() {
        let t = match_target("net.Inet6Resolver", "lookupAllHostAddr", "(string) -> addr[]")
            .expect("resolver target");
        assert_eq!(t.family, TargetFamily::Dns);
        assert_eq!(t.key, RESOLVER6_KEY);

        let t = match_target("nio.NetChannel", "connect0", "(fd, addr, int) -> int")
            .expect("connect target");
        assert_eq!(t.family, TargetFamily::Connect);
    }

    #[test]
    fn test_unrelated_bindings_do_not_match() {
        assert!(match_target("io.FileChannel", "open0", "(string) -> int").is_none());
        // Same name, different declaring type.
        assert!(match_target("net.CustomResolver", "lookupAllHostAddr", "(string) -> addr[]")
            .is_none());
        // Same identity, different shape.
        assert!(match_target("nio.NetChannel", "connect0", "(int) -> int").is_none());
    }
}
