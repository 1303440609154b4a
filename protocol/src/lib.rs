//! Common types shared between the airlock agent, the policy collaborator,
//! and tests: host-pattern matching, the policy-violation record, and the
//! decision protocol the agent speaks with the external policy oracle.

pub mod decision;
pub mod hostmatch;

pub use decision::*;
pub use hostmatch::HostPattern;
