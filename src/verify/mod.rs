//! Replication consistency probes
//!
//! Both verifiers follow the same shape: one write phase against the
//! primary side, then independent read checks that run concurrently once
//! every write has been acknowledged.

pub mod cluster;
pub mod plain;
pub mod probe;

pub use cluster::ClusterVerifier;
pub use plain::PlainVerifier;
pub use probe::{random_value, ProbeOutcome, ProbeResult};
