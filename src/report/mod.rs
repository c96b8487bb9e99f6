//! Detection results and their rendering
//!
//! Components emit `DetectEvent`s into an `EventSink` while the run
//! progresses; the run finishes with a `DetectionReport` value that callers
//! can assert on or serialize.

pub mod events;

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::cluster::{HealthWarning, TopologyMap};
use crate::config::NodeAddress;
use crate::detect::{Mode, RunState};
use crate::verify::ProbeResult;

pub use events::{DetectEvent, EventSink, MemorySink, TracingSink};

/// Pass/fail counts over all probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeSummary {
    pub passed: usize,
    pub failed: usize,
}

/// Outcome of one completed detection run
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub target: NodeAddress,
    pub mode: Mode,
    pub state: RunState,
    /// Replicas attached to the target (non-cluster modes)
    pub replicas: Vec<NodeAddress>,
    /// Shard map (cluster mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<TopologyMap>,
    pub health_warnings: Vec<HealthWarning>,
    /// Key used for the primary write/read self-check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_check_key: Option<String>,
    pub probes: Vec<ProbeResult>,
    pub summary: ProbeSummary,
}

impl DetectionReport {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON report to a file
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        let json = self.to_json().map_err(io::Error::from)?;
        writeln!(file, "{}", json)
    }

    /// Human-readable summary
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "====================================");
        let _ = writeln!(out, "Target: {}", self.target);
        let _ = writeln!(out, "Mode:   {}", self.mode);
        let _ = writeln!(out, "State:  {}", self.state);

        if let Some(ref topology) = self.topology {
            let _ = writeln!(out, "Shards: {}", topology.len());
            for (id, shard) in topology.iter() {
                let replicas: Vec<String> = shard.replicas.iter().map(|r| r.to_string()).collect();
                let _ = writeln!(
                    out,
                    "  {} {} slots={}{} -> [{}]",
                    short_id(id),
                    shard.primary,
                    shard.slots,
                    if shard.healthy { "" } else { " FAILING" },
                    replicas.join(", ")
                );
            }
        } else {
            let _ = writeln!(out, "Replicas: {}", self.replicas.len());
        }

        for w in &self.health_warnings {
            let _ = writeln!(out, "  WARN {}: {}", w.node(), warning_text(w));
        }

        if !self.probes.is_empty() {
            let _ = writeln!(out, "------------------------------------");
            for p in &self.probes {
                let status = if p.passed() { "PASS" } else { "FAIL" };
                let _ = writeln!(out, "  {} {} -> {} '{}'", status, p.primary, p.replica, p.key);
            }
        }

        let _ = writeln!(out, "====================================");
        let _ = writeln!(
            out,
            "Probes passed: {}, failed: {}",
            self.summary.passed, self.summary.failed
        );
        out
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn warning_text(w: &HealthWarning) -> String {
    match w {
        HealthWarning::StateNotOk { state, .. } => format!("cluster_state={}", state),
        HealthWarning::MissingSlots { assigned, .. } => {
            format!("cluster_slots_assigned={} (expected 16384)", assigned)
        }
        HealthWarning::Unreachable { error, .. } => format!("unreachable ({})", error),
        HealthWarning::Unprotected { .. } => "primary has no replica".to_string(),
    }
}
