//! Single-key probe for standalone, replication and sentinel deployments

use std::thread;

use super::probe::ProbeResult;
use crate::client::{ClientFactory, StoreClient};
use crate::config::{AuthConfig, NodeAddress, ProbeConfig};
use crate::utils::{ConnectionError, DetectError, Result};

pub struct PlainVerifier<'a> {
    factory: &'a dyn ClientFactory,
    auth: Option<&'a AuthConfig>,
    probe: &'a ProbeConfig,
}

impl<'a> PlainVerifier<'a> {
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

    pub fn key(&self) -> &str {
        &self.probe.key
    }

    /// Write `value` under the probe key and read it back from the primary
    ///
    /// Any failure here means the primary itself is broken and the whole
    /// run stops.
    pub fn check_write_path(&self, primary: &mut dyn StoreClient, value: &str) -> Result<()> {
        let key = self.key();
        let address = primary.address().to_string();
        let failed = |source: ConnectionError| DetectError::WritePathFailed {
            address: address.clone(),
            source,
        };

        primary
            .set_ex(key, value, self.probe.ttl_secs)
            .map_err(&failed)?;
        let actual = primary.get(key).map_err(&failed)?;

        if actual.as_deref() != Some(value) {
            return Err(DetectError::WritePathMismatch {
                address,
                key: key.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Read the probe key from every replica, one thread per replica
    ///
    /// Must only be called after `check_write_path` succeeded. Results come
    /// back in the order of `replicas`.
    pub fn check_replicas(
        &self,
        primary: &NodeAddress,
        replicas: &[NodeAddress],
        expected: &str,
    ) -> Vec<ProbeResult> {
        thread::scope(|s| {
            let handles: Vec<_> = replicas
                .iter()
                .map(|replica| {
                    let handle = s.spawn(move || self.check_replica(primary, replica, expected));
                    (replica, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(replica, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        ProbeResult::read_failed(
                            self.key(),
                            Some(expected),
                            primary,
                            replica,
                            "replica check panicked",
                        )
                    })
                })
                .collect()
        })
    }

    /// Compare one replica's copy of the probe key against `expected`
    pub fn check_replica(
        &self,
        primary: &NodeAddress,
        replica: &NodeAddress,
        expected: &str,
    ) -> ProbeResult {
        let key = self.key();
        let read = self
            .factory
            .connect(replica, self.auth)
            .and_then(|mut client| client.get(key));

        match read {
            Ok(actual) => ProbeResult::compare(key, expected, actual, primary, replica),
            Err(e) => ProbeResult::read_failed(key, Some(expected), primary, replica, e),
        }
    }
}
