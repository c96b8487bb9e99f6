//! In-memory test doubles for the client stack

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::control_plane::ControlPlane;
use super::store_client::{ClientFactory, NodeClient, StoreClient};
use crate::cluster::ClusterTopology;
use crate::config::{AuthConfig, NodeAddress};
use crate::utils::{ConnectionError, RespValue};

/// Replays canned replies in order and records every command sent
pub struct ScriptedControlPlane {
    responses: Vec<RespValue>,
    call_count: usize,
    commands: Vec<String>,
}

impl ScriptedControlPlane {
    pub fn new(responses: Vec<RespValue>) -> Self {
        Self {
            responses,
            call_count: 0,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.clone()
    }
}

impl ControlPlane for ScriptedControlPlane {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        self.commands.push(args.join(" "));
        if self.call_count < self.responses.len() {
            let resp = self.responses[self.call_count].clone();
            self.call_count += 1;
            Ok(resp)
        } else {
            Err(io::Error::new(io::ErrorKind::Other, "No more responses"))
        }
    }
}

pub type SharedData = Arc<Mutex<HashMap<String, String>>>;

/// One simulated server
#[derive(Default)]
pub struct MockNode {
    pub info: String,
    pub password: Option<String>,
    pub unreachable: bool,
    /// Keyspace; replicas that are in sync share their primary's map
    pub data: SharedData,
    pub cluster_nodes: String,
    pub cluster_info: String,
    /// Cluster replica: GET is redirected to this primary unless READONLY was sent
    pub replica_of: Option<NodeAddress>,
    /// Every SET is answered with MOVED to this address
    pub moved_to: Option<NodeAddress>,
    pub fail_reads: bool,
    pub commands: Mutex<Vec<String>>,
}

impl MockNode {
    pub fn with_info(info: impl Into<String>) -> Self {
        Self {
            info: info.into(),
            ..Default::default()
        }
    }

    pub fn sharing(mut self, data: &SharedData) -> Self {
        self.data = Arc::clone(data);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    fn handle(&self, session: &mut Session, args: &[&str]) -> RespValue {
        self.commands.lock().push(args.join(" "));

        if self.password.is_some() && !session.authed {
            return RespValue::Error("NOAUTH Authentication required.".to_string());
        }

        let command = args.first().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
        match (command.as_str(), &args[1..]) {
            ("PING", _) => RespValue::SimpleString("PONG".to_string()),
            ("INFO", _) => RespValue::BulkString(self.info.as_bytes().to_vec()),
            ("GET", [key]) => {
                if self.fail_reads {
                    return RespValue::Error("ERR injected read failure".to_string());
                }
                if let Some(ref primary) = self.replica_of {
                    if !session.readonly {
                        let slot = ClusterTopology::slot_for_key(key.as_bytes());
                        return RespValue::Error(format!("MOVED {} {}", slot, primary));
                    }
                }
                match self.data.lock().get(*key) {
                    Some(v) => RespValue::BulkString(v.as_bytes().to_vec()),
                    None => RespValue::Null,
                }
            }
            ("SET", [key, value, ..]) => {
                if let Some(ref target) = self.moved_to {
                    let slot = ClusterTopology::slot_for_key(key.as_bytes());
                    return RespValue::Error(format!("MOVED {} {}", slot, target));
                }
                self.data.lock().insert(key.to_string(), value.to_string());
                RespValue::SimpleString("OK".to_string())
            }
            ("SCAN", [_cursor, "MATCH", pattern, ..]) => {
                let prefix = pattern.trim_end_matches('*');
                let mut keys: Vec<String> = self
                    .data
                    .lock()
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .cloned()
                    .collect();
                keys.sort();
                RespValue::Array(vec![
                    RespValue::BulkString(b"0".to_vec()),
                    RespValue::Array(
                        keys.into_iter()
                            .map(|k| RespValue::BulkString(k.into_bytes()))
                            .collect(),
                    ),
                ])
            }
            ("CLUSTER", [sub]) => {
                let text = match sub.to_ascii_uppercase().as_str() {
                    "NODES" => &self.cluster_nodes,
                    "INFO" => &self.cluster_info,
                    _ => return RespValue::Error("ERR unknown subcommand".to_string()),
                };
                if text.is_empty() {
                    RespValue::Error("ERR This instance has cluster support disabled".to_string())
                } else {
                    RespValue::BulkString(text.as_bytes().to_vec())
                }
            }
            ("READONLY", []) => {
                session.readonly = true;
                RespValue::SimpleString("OK".to_string())
            }
            ("ASKING", []) => RespValue::SimpleString("OK".to_string()),
            _ => RespValue::Error(format!("ERR unknown command '{}'", command)),
        }
    }
}

#[derive(Default)]
struct Session {
    authed: bool,
    readonly: bool,
}

/// Connection to a `MockNode`
pub struct MockConnection {
    node: Arc<MockNode>,
    session: Session,
}

impl ControlPlane for MockConnection {
    fn execute(&mut self, args: &[&str]) -> io::Result<RespValue> {
        Ok(self.node.handle(&mut self.session, args))
    }
}

/// A set of simulated servers addressable through `ClientFactory`
#[derive(Default)]
pub struct MockFleet {
    nodes: BTreeMap<NodeAddress, Arc<MockNode>>,
    connects: Mutex<Vec<NodeAddress>>,
}

impl MockFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, address: NodeAddress, node: MockNode) -> Arc<MockNode> {
        let node = Arc::new(node);
        self.nodes.insert(address, Arc::clone(&node));
        node
    }

    pub fn node(&self, address: &NodeAddress) -> Arc<MockNode> {
        Arc::clone(&self.nodes[address])
    }

    /// Addresses connected to, in order
    pub fn connects(&self) -> Vec<NodeAddress> {
        self.connects.lock().clone()
    }
}

impl ClientFactory for MockFleet {
    fn connect(
        &self,
        address: &NodeAddress,
        auth: Option<&AuthConfig>,
    ) -> Result<Box<dyn StoreClient>, ConnectionError> {
        self.connects.lock().push(address.clone());

        let refused = || ConnectionError::ConnectFailed {
            host: address.host.clone(),
            port: address.port,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused"),
        };
        let node = self.nodes.get(address).ok_or_else(refused)?;
        if node.unreachable {
            return Err(refused());
        }

        let authed = match (&node.password, auth) {
            (Some(expected), Some(given)) if &given.password == expected => true,
            (Some(_), Some(_)) => {
                return Err(ConnectionError::AuthFailed(
                    "WRONGPASS invalid username-password pair or user is disabled.".to_string(),
                ))
            }
            _ => false,
        };

        let conn = MockConnection {
            node: Arc::clone(node),
            session: Session {
                authed,
                readonly: false,
            },
        };
        Ok(Box::new(NodeClient::new(address.clone(), conn)))
    }
}

/// INFO text for a primary with the given attached replicas
pub fn primary_info(replicas: &[NodeAddress]) -> String {
    let mut info = format!(
        "# Server\r\nredis_version:7.2.4\r\n\r\n# Replication\r\nrole:master\r\nconnected_slaves:{}\r\n",
        replicas.len()
    );
    for (i, r) in replicas.iter().enumerate() {
        info.push_str(&format!(
            "slave{}:ip={},port={},state=online,offset=100,lag=0\r\n",
            i, r.host, r.port
        ));
    }
    info.push_str("\r\n# Cluster\r\ncluster_enabled:0\r\n");
    info
}

pub fn replica_info(primary: &NodeAddress) -> String {
    format!(
        "# Replication\r\nrole:slave\r\nmaster_host:{}\r\nmaster_port:{}\r\nconnected_slaves:0\r\n\r\n# Cluster\r\ncluster_enabled:0\r\n",
        primary.host, primary.port
    )
}

pub fn cluster_node_info(role: &str) -> String {
    format!(
        "# Replication\r\nrole:{}\r\nconnected_slaves:0\r\n\r\n# Cluster\r\ncluster_enabled:1\r\n",
        role
    )
}

pub fn cluster_info_text(state: &str, slots_assigned: u32) -> String {
    format!(
        "cluster_state:{}\r\ncluster_slots_assigned:{}\r\ncluster_slots_ok:{}\r\ncluster_slots_pfail:0\r\ncluster_slots_fail:0\r\ncluster_known_nodes:6\r\ncluster_size:3\r\n",
        state, slots_assigned, slots_assigned
    )
}
