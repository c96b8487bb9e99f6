//! Cluster topology discovery and health
//!
//! - `node`: CLUSTER NODES records
//! - `topology`: slot ownership table and key hashing
//! - `topology_map`: primary -> replica pairing for verification
//! - `health`: CLUSTER INFO parsing and warnings
//! - `router`: slot-aware writes through the entry point

pub mod health;
pub mod node;
pub mod router;
pub mod topology;
pub mod topology_map;

pub use health::{summarize_health, ClusterHealth, HealthWarning, NodeHealth};
pub use node::{parse_cluster_node_line, parse_cluster_nodes, ClusterNode, CLUSTER_SLOTS};
pub use router::ClusterRouter;
pub use topology::ClusterTopology;
pub use topology_map::{build_topology, ShardEntry, TopologyMap};
