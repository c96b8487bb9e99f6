//! Typed per-node client used by detection and verification
//!
//! `StoreClient` is the capability surface the detector needs from one
//! node. `NodeClient` implements it over any `ControlPlane`, and
//! `ClientFactory` opens authenticated clients by address.

use std::time::Duration;

use super::control_plane::{check_reply, expect_ok, expect_text, unexpected, ControlPlane};
use super::info::{ReplicaEntry, ServerInfo};
use super::raw_connection::RawConnection;
use crate::cluster::{parse_cluster_nodes, ClusterHealth, ClusterNode};
use crate::config::{AuthConfig, DetectConfig, NodeAddress};
use crate::utils::{ConnectionError, ProtocolError, RespValue};

/// Request/response operations against a single node
pub trait StoreClient: Send {
    /// Address this client is connected to
    fn address(&self) -> &NodeAddress;

    fn ping(&mut self) -> Result<(), ConnectionError>;

    fn info(&mut self) -> Result<ServerInfo, ConnectionError>;

    fn get(&mut self, key: &str) -> Result<Option<String>, ConnectionError>;

    /// SET with an expiry in seconds
    fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ConnectionError>;

    /// One SCAN step: returns the next cursor and the keys of this page
    fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: u32,
    ) -> Result<(u64, Vec<String>), ConnectionError>;

    fn cluster_nodes(&mut self) -> Result<Vec<ClusterNode>, ConnectionError>;

    fn cluster_info(&mut self) -> Result<ClusterHealth, ConnectionError>;

    /// Allow reads on a cluster replica for this connection
    fn set_readonly(&mut self) -> Result<(), ConnectionError>;

    /// Prefix the next command with ASKING (cluster slot migration)
    fn asking(&mut self) -> Result<(), ConnectionError>;

    /// Replicas currently attached to this primary
    fn list_replicas(&mut self) -> Result<Vec<ReplicaEntry>, ConnectionError> {
        Ok(self.info()?.replicas())
    }
}

/// `StoreClient` over a raw control plane
pub struct NodeClient<C> {
    address: NodeAddress,
    conn: C,
}

impl<C: ControlPlane> NodeClient<C> {
    pub fn new(address: NodeAddress, conn: C) -> Self {
        Self { address, conn }
    }

    fn call(&mut self, args: &[&str]) -> Result<RespValue, ConnectionError> {
        Ok(self.conn.execute(args)?)
    }
}

impl<C: ControlPlane> StoreClient for NodeClient<C> {
    fn address(&self) -> &NodeAddress {
        &self.address
    }

    fn ping(&mut self) -> Result<(), ConnectionError> {
        match check_reply(self.call(&["PING"])?)? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(unexpected("PING", "+PONG", &other)),
        }
    }

    fn info(&mut self) -> Result<ServerInfo, ConnectionError> {
        let text = expect_text("INFO", self.call(&["INFO"])?)?;
        Ok(ServerInfo::parse(&text))
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, ConnectionError> {
        match self.call(&["GET", key])? {
            RespValue::Null => Ok(None),
            reply => expect_text("GET", reply).map(Some),
        }
    }

    fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ConnectionError> {
        let ttl = ttl_secs.to_string();
        let reply = self.call(&["SET", key, value, "EX", &ttl])?;
        expect_ok("SET", reply)
    }

    fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: u32,
    ) -> Result<(u64, Vec<String>), ConnectionError> {
        let cursor = cursor.to_string();
        let count = count.to_string();
        let reply = check_reply(self.call(&["SCAN", &cursor, "MATCH", pattern, "COUNT", &count])?)?;
        parse_scan_reply(&reply).ok_or_else(|| unexpected("SCAN", "[cursor, keys]", &reply))
    }

    fn cluster_nodes(&mut self) -> Result<Vec<ClusterNode>, ConnectionError> {
        let text = expect_text("CLUSTER NODES", self.call(&["CLUSTER", "NODES"])?)?;
        parse_cluster_nodes(&text)
            .map_err(|e| ProtocolError::Parse(e.to_string()).into())
    }

    fn cluster_info(&mut self) -> Result<ClusterHealth, ConnectionError> {
        let text = expect_text("CLUSTER INFO", self.call(&["CLUSTER", "INFO"])?)?;
        Ok(ClusterHealth::parse(&text))
    }

    fn set_readonly(&mut self) -> Result<(), ConnectionError> {
        let reply = self.call(&["READONLY"])?;
        expect_ok("READONLY", reply)
    }

    fn asking(&mut self) -> Result<(), ConnectionError> {
        let reply = self.call(&["ASKING"])?;
        expect_ok("ASKING", reply)
    }
}

/// Parse `[cursor, [key, ...]]`
fn parse_scan_reply(reply: &RespValue) -> Option<(u64, Vec<String>)> {
    let parts = reply.as_array()?;
    if parts.len() != 2 {
        return None;
    }
    let cursor: u64 = match &parts[0] {
        RespValue::Integer(i) => u64::try_from(*i).ok()?,
        other => other.as_str()?.parse().ok()?,
    };
    let keys = parts[1]
        .as_array()?
        .iter()
        .filter_map(|k| k.as_str().map(String::from))
        .collect();
    Some((cursor, keys))
}

/// Opens clients against node addresses
pub trait ClientFactory: Send + Sync {
    fn connect(
        &self,
        address: &NodeAddress,
        auth: Option<&AuthConfig>,
    ) -> Result<Box<dyn StoreClient>, ConnectionError>;
}

/// TCP connection factory with common timeouts
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ConnectionFactory {
    pub fn from_config(config: &DetectConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
        }
    }
}

impl ClientFactory for ConnectionFactory {
    fn connect(
        &self,
        address: &NodeAddress,
        auth: Option<&AuthConfig>,
    ) -> Result<Box<dyn StoreClient>, ConnectionError> {
        let mut conn = RawConnection::connect_tcp(&address.host, address.port, self.connect_timeout)?;
        conn.set_timeouts(self.request_timeout).ok();

        if let Some(auth) = auth {
            conn.authenticate(&auth.password, auth.username.as_deref())?;
        }

        Ok(Box::new(NodeClient::new(address.clone(), conn)))
    }
}
