//! Cluster node records parsed from CLUSTER NODES

use serde::Serialize;

use crate::config::NodeAddress;
use crate::utils::ClusterError;

/// Size of the cluster key space
pub const CLUSTER_SLOTS: u32 = 16384;

/// One line of CLUSTER NODES as reported by a cluster member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNode {
    /// Node ID from CLUSTER NODES
    pub id: String,
    /// Hostname or IP
    pub host: String,
    /// Port
    pub port: u16,
    /// Cluster bus port
    pub bus_port: u16,
    /// Node flags (myself, master, slave, fail, handshake, ...)
    pub flags: Vec<String>,
    /// Primary node ID (replicas only)
    pub primary_id: Option<String>,
    /// `connected` or `disconnected`
    pub link_state: String,
    /// Inclusive slot ranges served (primaries only)
    pub slot_ranges: Vec<(u16, u16)>,
}

impl ClusterNode {
    pub fn is_primary(&self) -> bool {
        self.has_flag("master")
    }

    pub fn is_replica(&self) -> bool {
        self.has_flag("slave") || self.has_flag("replica")
    }

    /// Connected and not flagged failing or mid-handshake
    pub fn is_healthy(&self) -> bool {
        self.link_state == "connected"
            && !self
                .flags
                .iter()
                .any(|f| f == "fail" || f == "fail?" || f == "handshake" || f == "noaddr")
    }

    pub fn slot_count(&self) -> u32 {
        self.slot_ranges
            .iter()
            .map(|&(start, end)| u32::from(end) - u32::from(start) + 1)
            .sum()
    }

    pub fn address(&self) -> NodeAddress {
        NodeAddress::new(self.host.clone(), self.port)
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Parse a full CLUSTER NODES reply, skipping blank lines
pub fn parse_cluster_nodes(response: &str) -> Result<Vec<ClusterNode>, ClusterError> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            parse_cluster_node_line(line).ok_or_else(|| ClusterError::ParseFailed(line.to_string()))
        })
        .collect()
}

/// Parse a line from CLUSTER NODES response
///
/// Format: `<id> <ip:port@cport> <flags> <master> <ping-sent> <pong-recv> <config-epoch> <link-state> <slot> <slot> ... <slot>`
///
/// Example:
/// ```text
/// 07c37dfeb235213a872192d90877d0cd55635b91 127.0.0.1:30004@31004 slave e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 0 1426238317239 4 connected
/// ```
pub fn parse_cluster_node_line(line: &str) -> Option<ClusterNode> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 8 {
        return None;
    }

    let (host, port, bus_port) = parse_node_address(parts[1])?;
    let flags: Vec<String> = parts[2].split(',').map(String::from).collect();

    let primary_id = match parts[3] {
        "-" => None,
        id => Some(id.to_string()),
    };

    let mut node = ClusterNode {
        id: parts[0].to_string(),
        host,
        port,
        bus_port,
        flags,
        primary_id,
        link_state: parts[7].to_string(),
        slot_ranges: Vec::new(),
    };

    if node.is_primary() {
        node.slot_ranges = parts[8..].iter().filter_map(|s| parse_slot_range(s)).collect();
    } else if !node.is_replica() {
        node.primary_id = None;
    }

    Some(node)
}

/// Parse node address from CLUSTER NODES
/// Formats: "host:port@cport", "host:port", "host:port@cport,hostname"
fn parse_node_address(addr: &str) -> Option<(String, u16, u16)> {
    let addr = addr.split(',').next().unwrap_or(addr);

    let (host_port, bus_port) = match addr.split_once('@') {
        Some((hp, bus)) => (hp, bus.parse().unwrap_or(0)),
        None => (addr, 0),
    };

    let (host, port) = host_port.rsplit_once(':')?;
    Some((host.to_string(), port.parse().ok()?, bus_port))
}

/// Parse slot range: "0-5460" or "0"
fn parse_slot_range(s: &str) -> Option<(u16, u16)> {
    // Importing/migrating markers look like "[123->-node_id]"
    if s.contains('[') {
        return None;
    }

    match s.split_once('-') {
        Some((start, end)) => Some((start.parse().ok()?, end.parse().ok()?)),
        None => {
            let slot: u16 = s.parse().ok()?;
            Some((slot, slot))
        }
    }
}
