//! Cluster slot ownership snapshot used to route probe writes

use super::node::{ClusterNode, CLUSTER_SLOTS};
use crate::config::NodeAddress;
use crate::utils::ClusterError;

/// Cluster topology snapshot
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    /// All nodes in the cluster
    pub nodes: Vec<ClusterNode>,
    /// Slot to node index mapping
    slot_map: Vec<Option<usize>>,
}

impl ClusterTopology {
    pub fn from_nodes(nodes: Vec<ClusterNode>) -> Result<Self, ClusterError> {
        let mut slot_map = vec![None; CLUSTER_SLOTS as usize];
        let mut has_primary = false;

        for (idx, node) in nodes.iter().enumerate() {
            if !node.is_primary() {
                continue;
            }
            has_primary = true;
            for &(start, end) in &node.slot_ranges {
                for slot in start..=end.min((CLUSTER_SLOTS - 1) as u16) {
                    slot_map[slot as usize] = Some(idx);
                }
            }
        }

        if !has_primary {
            return Err(ClusterError::NoPrimaries);
        }

        Ok(Self { nodes, slot_map })
    }

    /// Get node for slot
    pub fn get_node_for_slot(&self, slot: u16) -> Option<&ClusterNode> {
        self.slot_map
            .get(slot as usize)
            .copied()
            .flatten()
            .map(|idx| &self.nodes[idx])
    }

    /// Address of the primary serving `key`
    pub fn owner_of(&self, key: &str) -> Result<NodeAddress, ClusterError> {
        let slot = Self::slot_for_key(key.as_bytes());
        self.get_node_for_slot(slot)
            .map(ClusterNode::address)
            .ok_or(ClusterError::UnassignedSlot(slot))
    }

    /// Calculate slot for key using CRC16
    pub fn slot_for_key(key: &[u8]) -> u16 {
        // Check for hash tag {xxx}
        if let Some(start) = key.iter().position(|&b| b == b'{') {
            if let Some(end) = key[start + 1..].iter().position(|&b| b == b'}') {
                if end > 0 {
                    return crc16(&key[start + 1..start + 1 + end]) % CLUSTER_SLOTS as u16;
                }
            }
        }
        crc16(key) % CLUSTER_SLOTS as u16
    }
}

/// CRC16 implementation for cluster slot calculation (XMODEM)
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
