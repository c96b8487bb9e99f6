//! One end-to-end detection run

use super::classifier::Classifier;
use super::sentinel::SentinelProbe;
use super::{detector_for, DetectContext, Mode, RunState, Topology, Verification};
use crate::client::ClientFactory;
use crate::config::DetectConfig;
use crate::report::{DetectEvent, DetectionReport, EventSink, ProbeSummary};
use crate::utils::{DetectError, Result};

/// Drives `Unclassified -> Classified(mode) -> Verified | VerificationSkipped`
///
/// Any error ends the run where it happened; the state stays at the last
/// stage reached and no report is produced.
pub struct DetectionRun<'a, S: EventSink> {
    config: &'a DetectConfig,
    factory: &'a dyn ClientFactory,
    sink: S,
    state: RunState,
}

impl<'a, S: EventSink> DetectionRun<'a, S> {
    pub fn new(config: &'a DetectConfig, factory: &'a dyn ClientFactory, sink: S) -> Self {
        Self {
            config,
            factory,
            sink,
            state: RunState::Unclassified,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn execute(&mut self) -> Result<DetectionReport> {
        let config = self.config;
        let target = &config.target;

        let mut entry = self
            .factory
            .connect(target, config.auth.as_ref())
            .map_err(|source| DetectError::Unreachable {
                address: target.to_string(),
                source,
            })?;

        let mode = Classifier::new(self.factory, SentinelProbe::from_config(config), &mut self.sink)
            .classify(entry.as_mut())?;
        self.state = RunState::Classified(mode);
        self.sink.emit(DetectEvent::ModeDetected { mode });

        let ctx = DetectContext {
            factory: self.factory,
            config,
            sink: &mut self.sink,
        };
        let mut detector = detector_for(mode, entry, ctx);
        let topology = detector.build_topology()?;

        let (verification, state) = if config.verify {
            (detector.verify(&topology)?, RunState::Verified)
        } else {
            (Verification::default(), RunState::VerificationSkipped)
        };
        drop(detector);

        if state == RunState::VerificationSkipped {
            self.sink.emit(DetectEvent::VerificationSkipped {
                reason: "disabled by configuration".to_string(),
            });
        }
        self.state = state;

        let report = build_report(config, mode, state, topology, verification);
        self.sink.emit(DetectEvent::Finished {
            passed: report.summary.passed,
            failed: report.summary.failed,
        });
        Ok(report)
    }
}

fn build_report(
    config: &DetectConfig,
    mode: Mode,
    state: RunState,
    topology: Topology,
    verification: Verification,
) -> DetectionReport {
    let passed = verification.probes.iter().filter(|p| p.passed()).count();
    let summary = ProbeSummary {
        passed,
        failed: verification.probes.len() - passed,
    };

    let (replicas, topology, health_warnings) = match topology {
        Topology::Replicas(replicas) => (replicas, None, Vec::new()),
        Topology::Cluster { map, warnings } => (Vec::new(), Some(map), warnings),
    };

    DetectionReport {
        target: config.target.clone(),
        mode,
        state,
        replicas,
        topology,
        health_warnings,
        write_check_key: verification.write_check_key,
        probes: verification.probes,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{
        cluster_info_text, cluster_node_info, primary_info, replica_info, MockFleet, MockNode,
        SharedData,
    };
    use crate::cluster::HealthWarning;
    use crate::config::NodeAddress;
    use crate::report::MemorySink;
    use crate::verify::ProbeOutcome;

    fn primary() -> NodeAddress {
        NodeAddress::new("10.0.0.1", 6379)
    }

    fn run(fleet: &MockFleet, config: &DetectConfig) -> (Result<DetectionReport>, RunState, MemorySink) {
        let mut run = DetectionRun::new(config, fleet, MemorySink::new());
        let result = run.execute();
        let state = run.state();
        (result, state, run.into_sink())
    }

    #[test]
    fn test_standalone_end_to_end() {
        let mut fleet = MockFleet::new();
        fleet.add(primary(), MockNode::with_info(primary_info(&[])));
        let config = DetectConfig::for_target(primary());

        let (report, state, sink) = run(&fleet, &config);
        let report = report.unwrap();
        assert_eq!(report.mode, Mode::Standalone);
        assert_eq!(state, RunState::Verified);
        assert!(report.probes.is_empty());
        assert_eq!(report.write_check_key.as_deref(), Some("test_key"));
        assert!(!report.has_failures());

        assert_eq!(sink.events[1], DetectEvent::ModeDetected { mode: Mode::Standalone });
        assert_eq!(
            sink.events.last(),
            Some(&DetectEvent::Finished { passed: 0, failed: 0 })
        );
    }

    #[test]
    fn test_two_replicas_one_stale() {
        let good = NodeAddress::new("10.0.0.2", 6379);
        let stale = NodeAddress::new("10.0.0.3", 6379);
        let shared = SharedData::default();
        let mut fleet = MockFleet::new();
        fleet.add(
            primary(),
            MockNode::with_info(primary_info(&[good.clone(), stale.clone()])).sharing(&shared),
        );
        fleet.add(good.clone(), MockNode::with_info(replica_info(&primary())).sharing(&shared));
        fleet.add(stale.clone(), MockNode::with_info(replica_info(&primary())));
        let config = DetectConfig::for_target(primary());

        let (report, state, sink) = run(&fleet, &config);
        let report = report.unwrap();
        assert_eq!(report.mode, Mode::Replication);
        assert_eq!(state, RunState::Verified);
        assert_eq!(report.replicas, vec![good.clone(), stale.clone()]);
        assert_eq!(report.summary, ProbeSummary { passed: 1, failed: 1 });
        assert_eq!(report.probes[0].replica, good);
        assert_eq!(report.probes[1].outcome, ProbeOutcome::Mismatch);
        assert!(report.has_failures());
        assert_eq!(sink.probes().len(), 2);
    }

    #[test]
    fn test_write_path_failure_aborts() {
        let replica = NodeAddress::new("10.0.0.2", 6379);
        let mut broken = MockNode::with_info(primary_info(&[replica.clone()]));
        broken.fail_reads = true;
        let mut fleet = MockFleet::new();
        fleet.add(primary(), broken);
        fleet.add(replica.clone(), MockNode::with_info(replica_info(&primary())));
        let config = DetectConfig::for_target(primary());

        let (report, state, sink) = run(&fleet, &config);
        let err = report.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(state, RunState::Classified(Mode::Replication));
        // No replica was contacted after the primary self-check failed
        assert!(fleet.node(&replica).commands().is_empty());
        assert!(sink.probes().is_empty());
    }

    #[test]
    fn test_no_verify_skips_probes() {
        let replica = NodeAddress::new("10.0.0.2", 6379);
        let mut fleet = MockFleet::new();
        fleet.add(primary(), MockNode::with_info(primary_info(&[replica.clone()])));
        fleet.add(replica.clone(), MockNode::with_info(replica_info(&primary())));
        let mut config = DetectConfig::for_target(primary());
        config.verify = false;

        let (report, state, sink) = run(&fleet, &config);
        let report = report.unwrap();
        assert_eq!(state, RunState::VerificationSkipped);
        assert_eq!(report.state, RunState::VerificationSkipped);
        assert_eq!(report.replicas, vec![replica.clone()]);
        assert!(report.write_check_key.is_none());
        assert!(fleet.node(&primary()).data.lock().is_empty());
        assert!(sink
            .events
            .iter()
            .any(|e| matches!(e, DetectEvent::VerificationSkipped { .. })));
    }

    #[test]
    fn test_unreachable_target() {
        let fleet = MockFleet::new();
        let config = DetectConfig::for_target(primary());
        let (report, state, sink) = run(&fleet, &config);
        assert!(matches!(report, Err(DetectError::Unreachable { .. })));
        assert_eq!(state, RunState::Unclassified);
        assert!(sink.events.is_empty());
    }

    const CLUSTER_NODES: &str = "\
p1 10.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-5460
p2 10.0.0.2:7000@17000 master - 0 0 2 connected 5461-10922
p3 10.0.0.3:7000@17000 master - 0 0 3 connected 10923-16383
r1 10.0.0.11:7000@17000 slave p1 0 0 1 connected
r2 10.0.0.12:7000@17000 slave p2 0 0 2 connected
r3 10.0.0.13:7000@17000 slave p3 0 0 3 connected
";

    /// Three shards; `without_replica` lists primaries whose replica is missing
    fn cluster_fleet(without_replica: &[&str]) -> (MockFleet, String) {
        let nodes: String = CLUSTER_NODES
            .lines()
            .filter(|l| {
                let primary = l.split(' ').nth(3).unwrap_or("-");
                !without_replica.contains(&primary)
            })
            .map(|l| format!("{}\n", l))
            .collect();

        let mut fleet = MockFleet::new();
        for i in 1..=3 {
            let shared = SharedData::default();
            let primary = NodeAddress::new(format!("10.0.0.{}", i), 7000);
            let mut p = MockNode::with_info(cluster_node_info("master")).sharing(&shared);
            p.cluster_nodes = nodes.clone();
            p.cluster_info = cluster_info_text("ok", 16384);
            fleet.add(primary.clone(), p);

            let mut r = MockNode::with_info(cluster_node_info("slave")).sharing(&shared);
            r.cluster_nodes = nodes.clone();
            r.cluster_info = cluster_info_text("ok", 16384);
            r.replica_of = Some(primary);
            fleet.add(NodeAddress::new(format!("10.0.0.{}", 10 + i), 7000), r);
        }
        (fleet, nodes)
    }

    #[test]
    fn test_cluster_end_to_end() {
        let (fleet, _) = cluster_fleet(&[]);
        let config = DetectConfig::for_target(NodeAddress::new("10.0.0.1", 7000));

        let (report, state, sink) = run(&fleet, &config);
        let report = report.unwrap();
        assert_eq!(report.mode, Mode::Cluster);
        assert_eq!(state, RunState::Verified);
        assert_eq!(report.topology.as_ref().map(|t| t.len()), Some(3));
        assert!(report.health_warnings.is_empty());
        assert_eq!(report.probes.len(), 3);
        assert!(report.probes.iter().all(|p| p.passed()));
        assert!(report.write_check_key.is_none());
        assert!(sink
            .events
            .contains(&DetectEvent::KeysWritten { written: 20, total: 20 }));
    }

    #[test]
    fn test_cluster_unprotected_primary_skipped() {
        let (fleet, _) = cluster_fleet(&["p2"]);
        let config = DetectConfig::for_target(NodeAddress::new("10.0.0.1", 7000));

        let (report, _, sink) = run(&fleet, &config);
        let report = report.unwrap();
        assert_eq!(report.probes.len(), 2);
        assert!(!report.has_failures());
        assert!(report
            .probes
            .iter()
            .all(|p| p.primary != NodeAddress::new("10.0.0.2", 7000)));

        let unprotected = HealthWarning::Unprotected {
            node: NodeAddress::new("10.0.0.2", 7000),
        };
        assert_eq!(report.health_warnings, vec![unprotected.clone()]);
        assert_eq!(sink.warnings(), vec![&unprotected]);
    }
}
