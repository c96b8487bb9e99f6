//! Per-node cluster health from CLUSTER INFO

use std::collections::BTreeMap;

use serde::Serialize;

use super::node::CLUSTER_SLOTS;
use crate::config::NodeAddress;

/// Parsed CLUSTER INFO reply of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterHealth {
    pub state: String,
    pub slots_assigned: u32,
    pub slots_ok: u32,
    pub known_nodes: u32,
    pub size: u32,
}

impl ClusterHealth {
    pub fn parse(text: &str) -> Self {
        let mut health = ClusterHealth {
            state: String::new(),
            slots_assigned: 0,
            slots_ok: 0,
            known_nodes: 0,
            size: 0,
        };

        for (key, value) in text.lines().filter_map(|l| l.trim().split_once(':')) {
            let number = || value.parse().unwrap_or(0);
            match key {
                "cluster_state" => health.state = value.to_string(),
                "cluster_slots_assigned" => health.slots_assigned = number(),
                "cluster_slots_ok" => health.slots_ok = number(),
                "cluster_known_nodes" => health.known_nodes = number(),
                "cluster_size" => health.size = number(),
                _ => {}
            }
        }

        health
    }

    pub fn is_ok(&self) -> bool {
        self.state == "ok"
    }

    pub fn has_full_coverage(&self) -> bool {
        self.slots_assigned == CLUSTER_SLOTS
    }
}

/// Health as observed from one node; unreachable nodes are still reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeHealth {
    Reported(ClusterHealth),
    Unreachable(String),
}

/// A condition worth an operator's attention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthWarning {
    /// `cluster_state` other than `ok`
    StateNotOk { node: NodeAddress, state: String },
    /// Fewer (or more) than 16384 slots assigned
    MissingSlots { node: NodeAddress, assigned: u32 },
    /// CLUSTER INFO could not be fetched
    Unreachable { node: NodeAddress, error: String },
    /// Primary with no replica; its shard cannot be verified
    Unprotected { node: NodeAddress },
}

impl HealthWarning {
    pub fn node(&self) -> &NodeAddress {
        match self {
            HealthWarning::StateNotOk { node, .. }
            | HealthWarning::MissingSlots { node, .. }
            | HealthWarning::Unreachable { node, .. }
            | HealthWarning::Unprotected { node } => node,
        }
    }
}

/// Flag every node whose state is not `ok` or whose slot coverage is partial
///
/// Nodes that report both conditions produce two warnings. The result is
/// ordered by node address.
pub fn summarize_health(per_node: &BTreeMap<NodeAddress, NodeHealth>) -> Vec<HealthWarning> {
    let mut warnings = Vec::new();

    for (node, health) in per_node {
        match health {
            NodeHealth::Reported(h) => {
                if !h.is_ok() {
                    warnings.push(HealthWarning::StateNotOk {
                        node: node.clone(),
                        state: h.state.clone(),
                    });
                }
                if !h.has_full_coverage() {
                    warnings.push(HealthWarning::MissingSlots {
                        node: node.clone(),
                        assigned: h.slots_assigned,
                    });
                }
            }
            NodeHealth::Unreachable(error) => warnings.push(HealthWarning::Unreachable {
                node: node.clone(),
                error: error.clone(),
            }),
        }
    }

    warnings
}
