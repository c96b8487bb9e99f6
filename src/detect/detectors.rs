//! Per-mode topology discovery and verification

use super::{DetectContext, Detector, Mode, Topology, Verification};
use crate::client::StoreClient;
use crate::cluster::{build_topology, summarize_health, ClusterRouter, HealthWarning, NodeHealth};
use crate::report::DetectEvent;
use crate::utils::{DetectError, Result};
use crate::verify::{random_value, ClusterVerifier, PlainVerifier};

fn topology_kind(topology: &Topology) -> &'static str {
    match topology {
        Topology::Replicas(_) => "replica list",
        Topology::Cluster { .. } => "cluster",
    }
}

/// Standalone, replication and sentinel-managed deployments
///
/// All three share one primary that takes every write; the sentinel layer
/// only changes who promotes a new primary, not how data replicates.
pub struct PlainDetector<'a> {
    mode: Mode,
    primary: Box<dyn StoreClient>,
    ctx: DetectContext<'a>,
    rng: fastrand::Rng,
}

impl<'a> PlainDetector<'a> {
    pub fn new(mode: Mode, primary: Box<dyn StoreClient>, ctx: DetectContext<'a>) -> Self {
        Self {
            mode,
            primary,
            ctx,
            rng: fastrand::Rng::new(),
        }
    }
}

impl Detector for PlainDetector<'_> {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn build_topology(&mut self) -> Result<Topology> {
        let replicas: Vec<_> = self
            .primary
            .list_replicas()?
            .into_iter()
            .map(|r| r.address)
            .collect();

        self.ctx.sink.emit(DetectEvent::ReplicasFound {
            count: replicas.len(),
        });
        Ok(Topology::Replicas(replicas))
    }

    fn verify(&mut self, topology: &Topology) -> Result<Verification> {
        let replicas = match topology {
            Topology::Replicas(replicas) => replicas,
            other => {
                return Err(DetectError::TopologyMismatch {
                    mode: self.mode.to_string(),
                    found: topology_kind(other),
                })
            }
        };

        let config = self.ctx.config;
        let verifier = PlainVerifier::new(self.ctx.factory, config.auth.as_ref(), &config.probe);
        let value = random_value(&mut self.rng, config.probe.value_length);

        verifier.check_write_path(self.primary.as_mut(), &value)?;
        let primary = self.primary.address().clone();
        self.ctx.sink.emit(DetectEvent::WritePathOk {
            address: primary.clone(),
            key: verifier.key().to_string(),
        });

        let probes = verifier.check_replicas(&primary, replicas, &value);
        for probe in &probes {
            self.ctx.sink.emit(DetectEvent::Probe(probe.clone()));
        }

        Ok(Verification {
            write_check_key: Some(verifier.key().to_string()),
            probes,
        })
    }
}

/// Sharded deployments
pub struct ClusterDetector<'a> {
    entry: Option<Box<dyn StoreClient>>,
    router: Option<ClusterRouter<'a>>,
    ctx: DetectContext<'a>,
    rng: fastrand::Rng,
}

impl<'a> ClusterDetector<'a> {
    pub fn new(entry: Box<dyn StoreClient>, ctx: DetectContext<'a>) -> Self {
        Self {
            entry: Some(entry),
            router: None,
            ctx,
            rng: fastrand::Rng::new(),
        }
    }

    /// Router seeded from the entry connection, reconnecting if it was spent
    fn take_router(&mut self) -> Result<ClusterRouter<'a>> {
        if let Some(router) = self.router.take() {
            return Ok(router);
        }
        let factory = self.ctx.factory;
        let config = self.ctx.config;
        let entry = match self.entry.take() {
            Some(entry) => entry,
            None => factory.connect(&config.target, config.auth.as_ref())?,
        };
        ClusterRouter::new(factory, config.auth.as_ref(), entry)
    }

    fn discover(&mut self, router: &mut ClusterRouter<'a>) -> Topology {
        let map = build_topology(router.nodes());

        let per_node = router.cluster_info_per_node();
        let mut warnings = summarize_health(&per_node);
        for (node, health) in &per_node {
            let flagged = warnings.iter().any(|w| w.node() == node);
            if matches!(health, NodeHealth::Reported(_)) && !flagged {
                self.ctx.sink.emit(DetectEvent::NodeHealthy { node: node.clone() });
            }
        }

        warnings.extend(map.unprotected().map(|shard| HealthWarning::Unprotected {
            node: shard.primary.clone(),
        }));
        for warning in &warnings {
            self.ctx.sink.emit(DetectEvent::Health(warning.clone()));
        }

        Topology::Cluster { map, warnings }
    }
}

impl Detector for ClusterDetector<'_> {
    fn mode(&self) -> Mode {
        Mode::Cluster
    }

    fn build_topology(&mut self) -> Result<Topology> {
        let mut router = self.take_router()?;
        let topology = self.discover(&mut router);
        self.router = Some(router);
        Ok(topology)
    }

    fn verify(&mut self, topology: &Topology) -> Result<Verification> {
        let map = match topology {
            Topology::Cluster { map, .. } => map,
            other => {
                return Err(DetectError::TopologyMismatch {
                    mode: Mode::Cluster.to_string(),
                    found: topology_kind(other),
                })
            }
        };

        let config = self.ctx.config;
        let verifier = ClusterVerifier::new(self.ctx.factory, config.auth.as_ref(), &config.probe);

        let mut router = self.take_router()?;
        let written = verifier.write_keys(&mut router, &mut self.rng, &mut *self.ctx.sink);
        self.router = Some(router);
        written?;

        let probes = verifier.verify_pairs(map);
        for probe in &probes {
            self.ctx.sink.emit(DetectEvent::Probe(probe.clone()));
        }

        Ok(Verification {
            write_check_key: None,
            probes,
        })
    }
}
