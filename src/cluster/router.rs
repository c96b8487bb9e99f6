//! Slot-aware write routing through a cluster entry point
//!
//! The router seeds its slot table from the entry node, sends each write to
//! the slot owner and follows MOVED (reloading the table) and ASK
//! redirects, the way a cluster-aware client would.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use super::health::NodeHealth;
use super::node::ClusterNode;
use super::topology::ClusterTopology;
use crate::client::{ClientFactory, StoreClient};
use crate::config::{AuthConfig, NodeAddress};
use crate::utils::resp::RedirectKind;
use crate::utils::{ClusterError, ConnectionError, DetectError, ProtocolError, Result};

const MAX_REDIRECTS: usize = 5;

pub struct ClusterRouter<'a> {
    factory: &'a dyn ClientFactory,
    auth: Option<&'a AuthConfig>,
    entry: NodeAddress,
    topology: ClusterTopology,
    connections: HashMap<NodeAddress, Box<dyn StoreClient>>,
}

impl<'a> ClusterRouter<'a> {
    /// Load the slot table from an already connected entry node
    pub fn new(
        factory: &'a dyn ClientFactory,
        auth: Option<&'a AuthConfig>,
        mut entry: Box<dyn StoreClient>,
    ) -> Result<Self> {
        let topology = ClusterTopology::from_nodes(entry.cluster_nodes()?)?;
        let entry_address = entry.address().clone();

        let mut connections = HashMap::new();
        connections.insert(entry_address.clone(), entry);

        Ok(Self {
            factory,
            auth,
            entry: entry_address,
            topology,
            connections,
        })
    }

    /// Address the router was seeded from
    pub fn entry(&self) -> &NodeAddress {
        &self.entry
    }

    /// Node records of the current snapshot
    pub fn nodes(&self) -> &[ClusterNode] {
        &self.topology.nodes
    }

    /// Reload the slot table from the entry node
    pub fn refresh(&mut self) -> Result<()> {
        let entry = self.entry.clone();
        let nodes = self.connection(&entry)?.cluster_nodes()?;
        self.topology = ClusterTopology::from_nodes(nodes)?;
        Ok(())
    }

    /// SET with expiry on the owner of `key`; returns the node that accepted it
    pub fn set_ex(&mut self, key: &str, value: &str, ttl_secs: u64) -> Result<NodeAddress> {
        let mut target = self.topology.owner_of(key)?;
        let mut asking = false;

        for _ in 0..MAX_REDIRECTS {
            let client = self.connection(&target)?;
            if asking {
                client.asking()?;
            }

            let result = client.set_ex(key, value, ttl_secs);
            match result {
                Ok(()) => return Ok(target),
                Err(ConnectionError::Protocol(ProtocolError::Redirect {
                    kind, host, port, ..
                })) => {
                    asking = kind == RedirectKind::Ask;
                    if kind == RedirectKind::Moved {
                        self.refresh()?;
                    }
                    target = NodeAddress::new(host, port);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ClusterError::TooManyRedirects(key.to_string()).into())
    }

    /// CLUSTER INFO from every node in the snapshot
    ///
    /// A node that cannot be reached is reported as such rather than
    /// failing the whole fan-out.
    pub fn cluster_info_per_node(&mut self) -> BTreeMap<NodeAddress, NodeHealth> {
        let addresses: Vec<NodeAddress> = self.topology.nodes.iter().map(|n| n.address()).collect();

        addresses
            .into_iter()
            .map(|address| {
                let health = match self
                    .connection(&address)
                    .and_then(|c| c.cluster_info().map_err(DetectError::from))
                {
                    Ok(h) => NodeHealth::Reported(h),
                    Err(e) => NodeHealth::Unreachable(e.to_string()),
                };
                (address, health)
            })
            .collect()
    }

    fn connection(&mut self, address: &NodeAddress) -> Result<&mut Box<dyn StoreClient>> {
        match self.connections.entry(address.clone()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let client = self.factory.connect(address, self.auth)?;
                Ok(e.insert(client))
            }
        }
    }
}
