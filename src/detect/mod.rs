//! Deployment mode detection
//!
//! A run classifies the entry point into a `Mode`, then hands off to the
//! `Detector` for that mode, which discovers the topology and runs the
//! consistency probe.

pub mod classifier;
pub mod detectors;
pub mod run;
pub mod sentinel;

use std::fmt;

use serde::Serialize;

use crate::client::{ClientFactory, StoreClient};
use crate::cluster::{HealthWarning, TopologyMap};
use crate::config::{DetectConfig, NodeAddress};
use crate::report::EventSink;
use crate::utils::Result;
use crate::verify::ProbeResult;

pub use classifier::Classifier;
pub use detectors::{ClusterDetector, PlainDetector};
pub use run::DetectionRun;
pub use sentinel::SentinelProbe;

/// Deployment mode of the inspected store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Standalone,
    Replication,
    SentinelManaged,
    Cluster,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Standalone => "standalone",
            Mode::Replication => "replication",
            Mode::SentinelManaged => "sentinel",
            Mode::Cluster => "cluster",
        };
        f.write_str(name)
    }
}

/// Progress of one detection run
///
/// `Unclassified -> Classified(mode) -> Verified | VerificationSkipped`.
/// There is no way back: a failed run is re-invoked from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Unclassified,
    Classified(Mode),
    Verified,
    VerificationSkipped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Unclassified => f.write_str("unclassified"),
            RunState::Classified(mode) => write!(f, "classified ({})", mode),
            RunState::Verified => f.write_str("verified"),
            RunState::VerificationSkipped => f.write_str("verification skipped"),
        }
    }
}

/// What a detector discovered about the deployment
#[derive(Debug, Clone)]
pub enum Topology {
    /// Replicas attached to the entry primary (empty when standalone)
    Replicas(Vec<NodeAddress>),
    Cluster {
        map: TopologyMap,
        warnings: Vec<HealthWarning>,
    },
}

/// Output of a detector's verify step
#[derive(Debug, Clone, Default)]
pub struct Verification {
    /// Key used for the primary self-check (plain modes)
    pub write_check_key: Option<String>,
    pub probes: Vec<ProbeResult>,
}

/// Shared handles every detector is built with
pub struct DetectContext<'a> {
    pub factory: &'a dyn ClientFactory,
    pub config: &'a DetectConfig,
    pub sink: &'a mut dyn EventSink,
}

/// Mode-specific topology discovery and verification
pub trait Detector {
    fn mode(&self) -> Mode;

    fn build_topology(&mut self) -> Result<Topology>;

    fn verify(&mut self, topology: &Topology) -> Result<Verification>;
}

/// Pick the detector for a classified mode
///
/// Takes ownership of the entry point connection.
pub fn detector_for<'a>(
    mode: Mode,
    entry: Box<dyn StoreClient>,
    ctx: DetectContext<'a>,
) -> Box<dyn Detector + 'a> {
    match mode {
        Mode::Cluster => Box::new(ClusterDetector::new(entry, ctx)),
        Mode::Standalone | Mode::Replication | Mode::SentinelManaged => {
            Box::new(PlainDetector::new(mode, entry, ctx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(Mode::SentinelManaged.to_string(), "sentinel");
        assert_eq!(
            serde_json::to_value(Mode::SentinelManaged).unwrap(),
            "sentinel_managed"
        );
    }

    #[test]
    fn test_run_state_names() {
        assert_eq!(RunState::VerificationSkipped.to_string(), "verification skipped");
        assert_eq!(
            RunState::Classified(Mode::Standalone).to_string(),
            "classified (standalone)"
        );
    }
}
