//! Multi-key probe for cluster deployments
//!
//! Probe keys are written through the slot router so they land on every
//! shard, then each primary/replica pair is checked on whichever probe key
//! its shard ended up owning.

use std::thread;

use super::probe::{random_value, ProbeResult};
use crate::client::{ClientFactory, StoreClient};
use crate::cluster::{ClusterRouter, TopologyMap};
use crate::config::{AuthConfig, NodeAddress, ProbeConfig};
use crate::report::{DetectEvent, EventSink};
use crate::utils::{ConnectionError, DetectError, Result};

const SCAN_COUNT: u32 = 100;
const PROGRESS_EVERY: u32 = 5;

pub struct ClusterVerifier<'a> {
    factory: &'a dyn ClientFactory,
    auth: Option<&'a AuthConfig>,
    probe: &'a ProbeConfig,
}

impl<'a> ClusterVerifier<'a> {
    pub fn new(
        factory: &'a dyn ClientFactory,
        auth: Option<&'a AuthConfig>,
        probe: &'a ProbeConfig,
    ) -> Self {
        Self {
            factory,
            auth,
            probe,
        }
    }

    /// Bulk-write phase: one key per index, each with its own random value
    ///
    /// A connection failure while writing aborts the run, like a failed
    /// write path in the plain verifier.
    pub fn write_keys(
        &self,
        router: &mut ClusterRouter<'_>,
        rng: &mut fastrand::Rng,
        sink: &mut dyn EventSink,
    ) -> Result<u32> {
        let total = self.probe.cluster_keys;
        let entry = router.entry().clone();

        for i in 0..total {
            let key = self.probe.cluster_key(i);
            let value = random_value(rng, self.probe.value_length);

            router
                .set_ex(&key, &value, self.probe.ttl_secs)
                .map_err(|e| match e {
                    DetectError::Connection(source) => DetectError::WritePathFailed {
                        address: entry.to_string(),
                        source,
                    },
                    other => other,
                })?;

            let written = i + 1;
            if written % PROGRESS_EVERY == 0 || written == total {
                sink.emit(DetectEvent::KeysWritten { written, total });
            }
        }

        Ok(total)
    }

    /// Check every primary/replica pair of `topology` concurrently
    ///
    /// Primaries without a replica produce no result. Results follow the
    /// order of `TopologyMap::pairs`.
    pub fn verify_pairs(&self, topology: &TopologyMap) -> Vec<ProbeResult> {
        let pairs: Vec<(&NodeAddress, &NodeAddress)> = topology.pairs().collect();

        thread::scope(|s| {
            let handles: Vec<_> = pairs
                .iter()
                .map(|&(primary, replica)| {
                    let handle = s.spawn(move || self.check_pair(primary, replica));
                    (primary, replica, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(primary, replica, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        ProbeResult::unresolved(primary, replica, "pair check panicked")
                    })
                })
                .collect()
        })
    }

    /// Locate a probe key on `primary` and compare it against `replica`
    pub fn check_pair(&self, primary: &NodeAddress, replica: &NodeAddress) -> ProbeResult {
        let (key, expected) = match self.read_primary(primary) {
            Ok(Some(found)) => found,
            Ok(None) => {
                return ProbeResult::unresolved(
                    primary,
                    replica,
                    format!("no key matching '{}' on primary", self.probe.cluster_pattern()),
                )
            }
            Err(e) => return ProbeResult::unresolved(primary, replica, e),
        };

        let read = self.factory.connect(replica, self.auth).and_then(|mut client| {
            client.set_readonly()?;
            client.get(&key)
        });

        match read {
            Ok(actual) => ProbeResult::compare(&key, &expected, actual, primary, replica),
            Err(e) => ProbeResult::read_failed(&key, Some(&expected), primary, replica, e),
        }
    }

    /// First probe key found on `primary` together with its current value
    fn read_primary(
        &self,
        primary: &NodeAddress,
    ) -> std::result::Result<Option<(String, String)>, ConnectionError> {
        let mut client = self.factory.connect(primary, self.auth)?;
        let key = match find_key(client.as_mut(), &self.probe.cluster_pattern())? {
            Some(key) => key,
            None => return Ok(None),
        };
        // The key may have expired between SCAN and GET
        Ok(client.get(&key)?.map(|value| (key, value)))
    }
}

/// Walk SCAN cursors until a matching key shows up or the keyspace ends
fn find_key(
    client: &mut dyn StoreClient,
    pattern: &str,
) -> std::result::Result<Option<String>, ConnectionError> {
    let mut cursor = 0;
    loop {
        let (next, mut keys) = client.scan(cursor, pattern, SCAN_COUNT)?;
        if !keys.is_empty() {
            return Ok(Some(keys.swap_remove(0)));
        }
        if next == 0 {
            return Ok(None);
        }
        cursor = next;
    }
}
