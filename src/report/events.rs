//! Detection events and the sinks that receive them

use tracing::{debug, info, warn};

use crate::cluster::HealthWarning;
use crate::config::NodeAddress;
use crate::detect::Mode;
use crate::verify::{ProbeOutcome, ProbeResult};

/// Something observed during one detection run
#[derive(Debug, Clone, PartialEq)]
pub enum DetectEvent {
    Connected { address: NodeAddress },
    ModeDetected { mode: Mode },
    SentinelProbed { address: NodeAddress, found: bool },
    ReplicasFound { count: usize },
    WritePathOk { address: NodeAddress, key: String },
    KeysWritten { written: u32, total: u32 },
    NodeHealthy { node: NodeAddress },
    Health(HealthWarning),
    Probe(ProbeResult),
    VerificationSkipped { reason: String },
    Finished { passed: usize, failed: usize },
}

/// Receives events for one detection run
pub trait EventSink {
    fn emit(&mut self, event: DetectEvent);
}

/// Renders events as tracing lines
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: DetectEvent) {
        match event {
            DetectEvent::Connected { address } => info!("[{}] connected", address),
            DetectEvent::ModeDetected { mode } => info!("Detected deployment mode: {}", mode),
            DetectEvent::SentinelProbed { address, found } => {
                debug!("Sentinel probe at {}: {}", address, if found { "found" } else { "absent" })
            }
            DetectEvent::ReplicasFound { count } => info!("Found {} replica(s)", count),
            DetectEvent::WritePathOk { address, key } => {
                info!("[{}] write/read check on '{}' passed", address, key)
            }
            DetectEvent::KeysWritten { written, total } => {
                info!("Wrote probe keys {}/{}", written, total)
            }
            DetectEvent::NodeHealthy { node } => info!("[{}] cluster state ok", node),
            DetectEvent::Health(w) => match w {
                HealthWarning::StateNotOk { node, state } => {
                    warn!("[{}] cluster state is '{}'", node, state)
                }
                HealthWarning::MissingSlots { node, assigned } => {
                    warn!("[{}] only {} of 16384 slots assigned", node, assigned)
                }
                HealthWarning::Unreachable { node, error } => {
                    warn!("[{}] CLUSTER INFO failed: {}", node, error)
                }
                HealthWarning::Unprotected { node } => warn!("[{}] primary has no replica", node),
            },
            DetectEvent::Probe(result) => match result.outcome {
                ProbeOutcome::Pass => info!(
                    "primary {} -> replica {}: replication consistent",
                    result.primary, result.replica
                ),
                ProbeOutcome::Mismatch => warn!(
                    "primary {} -> replica {}: replication INCONSISTENT on '{}' (got {:?})",
                    result.primary, result.replica, result.key, result.actual
                ),
                ProbeOutcome::ReadFailed(ref e) => warn!(
                    "primary {} -> replica {}: read failed: {}",
                    result.primary, result.replica, e
                ),
                ProbeOutcome::Unresolved(ref reason) => warn!(
                    "primary {} -> replica {}: no probe key to compare: {}",
                    result.primary, result.replica, reason
                ),
            },
            DetectEvent::VerificationSkipped { reason } => info!("Verification skipped: {}", reason),
            DetectEvent::Finished { passed, failed } => {
                if failed == 0 {
                    info!("Check complete: {} passed", passed)
                } else {
                    warn!("Check complete: {} passed, {} failed", passed, failed)
                }
            }
        }
    }
}

/// Records events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<DetectEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probes(&self) -> Vec<&ProbeResult> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DetectEvent::Probe(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<&HealthWarning> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DetectEvent::Health(w) => Some(w),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, event: DetectEvent) {
        self.events.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: DetectEvent) {
        (**self).emit(event);
    }
}
