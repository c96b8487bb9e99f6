//! INFO response parsing
//!
//! INFO replies are `field:value` lines grouped under `# Section` headers.
//! Only a handful of fields drive classification; the rest are kept in
//! the raw map for reporting.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::NodeAddress;

/// Role a node reports for itself at observation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRole {
    Primary,
    Replica,
}

impl NodeRole {
    /// Parse the INFO `role` field (`master`/`slave`, or the newer spellings)
    pub fn from_info(role: &str) -> Option<Self> {
        match role {
            "master" | "primary" => Some(NodeRole::Primary),
            "slave" | "replica" => Some(NodeRole::Replica),
            _ => None,
        }
    }
}

/// Replica as reported by its primary (`slaveN:ip=..,port=..,state=..`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaEntry {
    pub address: NodeAddress,
    pub state: Option<String>,
    pub offset: Option<u64>,
    pub lag: Option<u64>,
}

impl ReplicaEntry {
    /// Parse the value part of a `slaveN` line
    pub fn parse(value: &str) -> Option<Self> {
        let fields: HashMap<&str, &str> = value
            .split(',')
            .filter_map(|kv| kv.split_once('='))
            .collect();

        let host = fields.get("ip")?;
        let port: u16 = fields.get("port")?.parse().ok()?;

        Some(Self {
            address: NodeAddress::new(*host, port),
            state: fields.get("state").map(|s| s.to_string()),
            offset: fields.get("offset").and_then(|s| s.parse().ok()),
            lag: fields.get("lag").and_then(|s| s.parse().ok()),
        })
    }
}

/// Parsed INFO reply
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    fields: HashMap<String, String>,
}

impl ServerInfo {
    pub fn parse(text: &str) -> Self {
        let fields = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.get(field).and_then(|v| v.parse().ok())
    }

    pub fn role(&self) -> Option<NodeRole> {
        self.get("role").and_then(NodeRole::from_info)
    }

    pub fn connected_slaves(&self) -> u64 {
        self.get_u64("connected_slaves").unwrap_or(0)
    }

    /// `cluster_enabled:1` in the Cluster section
    pub fn cluster_enabled(&self) -> bool {
        self.get_u64("cluster_enabled") == Some(1)
    }

    /// Replicas listed in the Replication section, ordered by slot index
    pub fn replicas(&self) -> Vec<ReplicaEntry> {
        let mut indexed: Vec<(u32, ReplicaEntry)> = self
            .fields
            .iter()
            .filter_map(|(k, v)| {
                let idx: u32 = k.strip_prefix("slave")?.parse().ok()?;
                Some((idx, ReplicaEntry::parse(v)?))
            })
            .collect();
        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, entry)| entry).collect()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.get("valkey_version").or_else(|| self.get("redis_version"))
    }
}
