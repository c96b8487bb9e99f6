//! Deployment mode classification of a primary entry point

use super::sentinel::SentinelProbe;
use super::Mode;
use crate::client::{ClientFactory, NodeRole, StoreClient};
use crate::report::{DetectEvent, EventSink};
use crate::utils::{DetectError, ProtocolError, Result};

pub struct Classifier<'a> {
    factory: &'a dyn ClientFactory,
    sentinel: SentinelProbe<'a>,
    sink: &'a mut dyn EventSink,
}

impl<'a> Classifier<'a> {
    pub fn new(
        factory: &'a dyn ClientFactory,
        sentinel: SentinelProbe<'a>,
        sink: &'a mut dyn EventSink,
    ) -> Self {
        Self {
            factory,
            sentinel,
            sink,
        }
    }

    /// Determine the deployment mode behind `client`
    ///
    /// Cluster capability is checked before the replica count: a cluster
    /// primary shows no classic replicas and would otherwise look
    /// standalone. Zero connected replicas is taken as standalone even if
    /// replicas may still be provisioning.
    pub fn classify(&mut self, client: &mut dyn StoreClient) -> Result<Mode> {
        let address = client.address().clone();

        client.ping().map_err(|source| DetectError::Unreachable {
            address: address.to_string(),
            source,
        })?;
        self.sink.emit(DetectEvent::Connected {
            address: address.clone(),
        });

        let info = client.info()?;
        let role = info.role().ok_or_else(|| {
            ProtocolError::Parse(format!("INFO from {} has no usable role field", address))
        })?;

        if role == NodeRole::Replica {
            return Err(DetectError::ReplicaEntryPoint {
                address: address.to_string(),
            });
        }

        if info.cluster_enabled() {
            return Ok(Mode::Cluster);
        }

        if info.connected_slaves() == 0 {
            return Ok(Mode::Standalone);
        }

        if self.sentinel.probe(self.factory, &mut *self.sink)? {
            Ok(Mode::SentinelManaged)
        } else {
            Ok(Mode::Replication)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{cluster_node_info, primary_info, replica_info, MockFleet, MockNode};
    use crate::config::NodeAddress;
    use crate::report::MemorySink;

    fn primary() -> NodeAddress {
        NodeAddress::new("10.0.0.1", 6379)
    }

    fn sentinel() -> NodeAddress {
        NodeAddress::new("10.0.0.1", 26379)
    }

    fn classify(fleet: &MockFleet) -> Result<Mode> {
        let mut sink = MemorySink::new();
        let mut client = fleet.connect(&primary(), None).unwrap();
        let probe = SentinelProbe::new(sentinel(), None, None);
        Classifier::new(fleet, probe, &mut sink).classify(client.as_mut())
    }

    fn fleet_with_primary(info: String) -> MockFleet {
        let mut fleet = MockFleet::new();
        fleet.add(primary(), MockNode::with_info(info));
        fleet
    }

    #[test]
    fn test_cluster_wins_over_replica_count() {
        for info in [
            cluster_node_info("master"),
            "role:master\r\nconnected_slaves:3\r\ncluster_enabled:1\r\n".to_string(),
        ] {
            let fleet = fleet_with_primary(info);
            assert_eq!(classify(&fleet).unwrap(), Mode::Cluster);
        }
    }

    #[test]
    fn test_replica_entry_point_aborts() {
        let fleet = fleet_with_primary(replica_info(&NodeAddress::new("10.0.0.9", 6379)));
        let err = classify(&fleet).unwrap_err();
        assert!(matches!(err, DetectError::ReplicaEntryPoint { .. }));
        assert!(err.is_fatal());
        // Nothing beyond PING and INFO reached the node
        let commands = fleet.node(&primary()).commands();
        assert_eq!(commands, vec!["PING", "INFO"]);
    }

    #[test]
    fn test_replica_with_cluster_enabled_still_aborts() {
        let fleet = fleet_with_primary(cluster_node_info("slave"));
        assert!(matches!(
            classify(&fleet),
            Err(DetectError::ReplicaEntryPoint { .. })
        ));
    }

    #[test]
    fn test_standalone() {
        let fleet = fleet_with_primary(primary_info(&[]));
        assert_eq!(classify(&fleet).unwrap(), Mode::Standalone);
        // No sentinel probe for a primary without replicas
        assert_eq!(fleet.connects(), vec![primary()]);
    }

    #[test]
    fn test_replication_without_sentinel() {
        let fleet = fleet_with_primary(primary_info(&[NodeAddress::new("10.0.0.2", 6379)]));
        assert_eq!(classify(&fleet).unwrap(), Mode::Replication);
    }

    #[test]
    fn test_sentinel_managed() {
        let mut fleet = fleet_with_primary(primary_info(&[NodeAddress::new("10.0.0.2", 6379)]));
        fleet.add(sentinel(), MockNode::with_info("redis_mode:sentinel\r\n"));
        assert_eq!(classify(&fleet).unwrap(), Mode::SentinelManaged);
    }

    #[test]
    fn test_rejected_ping_is_unreachable() {
        // Password-protected node answers PING with NOAUTH
        let mut locked = MockNode::with_info(primary_info(&[]));
        locked.password = Some("pw".to_string());
        let mut fleet = MockFleet::new();
        fleet.add(primary(), locked);

        let mut sink = MemorySink::new();
        let mut client = fleet.connect(&primary(), None).unwrap();
        let probe = SentinelProbe::new(sentinel(), None, None);
        let err = Classifier::new(&fleet, probe, &mut sink)
            .classify(client.as_mut())
            .unwrap_err();
        assert!(matches!(err, DetectError::Unreachable { .. }));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_connected_event_first() {
        let fleet = fleet_with_primary(primary_info(&[]));
        let mut sink = MemorySink::new();
        let mut client = fleet.connect(&primary(), None).unwrap();
        let probe = SentinelProbe::new(sentinel(), None, None);
        Classifier::new(&fleet, probe, &mut sink)
            .classify(client.as_mut())
            .unwrap();
        assert_eq!(
            sink.events[0],
            DetectEvent::Connected {
                address: primary()
            }
        );
    }

    #[test]
    fn test_missing_role() {
        let fleet = fleet_with_primary("connected_slaves:0\r\n".to_string());
        assert!(matches!(classify(&fleet), Err(DetectError::Protocol(_))));
    }
}
