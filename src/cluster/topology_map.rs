//! Primary to replica pairing for cluster-mode verification

use std::collections::BTreeMap;

use serde::Serialize;

use super::node::ClusterNode;
use crate::config::NodeAddress;

/// A primary and the replicas that follow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardEntry {
    pub primary: NodeAddress,
    /// Slots the primary serves according to the snapshot
    pub slots: u32,
    /// Primary link is up and not flagged `fail`, `fail?`, `handshake` or `noaddr`
    pub healthy: bool,
    /// Sorted, deduplicated
    pub replicas: Vec<NodeAddress>,
}

impl ShardEntry {
    pub fn is_protected(&self) -> bool {
        !self.replicas.is_empty()
    }
}

/// Primary node id -> shard entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TopologyMap {
    shards: BTreeMap<String, ShardEntry>,
}

impl TopologyMap {
    pub fn get(&self, primary_id: &str) -> Option<&ShardEntry> {
        self.shards.get(primary_id)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Entries ordered by primary id
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShardEntry)> {
        self.shards.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Primaries without any replica
    pub fn unprotected(&self) -> impl Iterator<Item = &ShardEntry> {
        self.shards.values().filter(|e| !e.is_protected())
    }

    /// Every (primary, replica) pair
    pub fn pairs(&self) -> impl Iterator<Item = (&NodeAddress, &NodeAddress)> {
        self.shards
            .values()
            .flat_map(|e| e.replicas.iter().map(move |r| (&e.primary, r)))
    }
}

/// Build the primary -> replica map from one CLUSTER NODES snapshot
///
/// Pass one registers every primary; pass two attaches each replica to the
/// primary it names. Replicas naming a primary absent from the snapshot are
/// dropped. The result does not depend on record order.
pub fn build_topology(nodes: &[ClusterNode]) -> TopologyMap {
    let mut shards: BTreeMap<String, ShardEntry> = nodes
        .iter()
        .filter(|n| n.is_primary())
        .map(|n| {
            let entry = ShardEntry {
                primary: n.address(),
                slots: n.slot_count(),
                healthy: n.is_healthy(),
                replicas: Vec::new(),
            };
            (n.id.clone(), entry)
        })
        .collect();

    for node in nodes.iter().filter(|n| n.is_replica()) {
        let Some(ref primary_id) = node.primary_id else {
            continue;
        };
        if let Some(entry) = shards.get_mut(primary_id) {
            entry.replicas.push(node.address());
        }
    }

    for entry in shards.values_mut() {
        entry.replicas.sort();
        entry.replicas.dedup();
    }

    TopologyMap { shards }
}
