//! Sentinel layer detection
//!
//! A sentinel deployment is recognized by a sentinel process answering on
//! the conventional secondary port of the primary's host. Credentials are
//! tried in order: the sentinel's own, then the primary's, since operators
//! often reuse one password.

use crate::client::ClientFactory;
use crate::config::{AuthConfig, DetectConfig, NodeAddress};
use crate::report::{DetectEvent, EventSink};
use crate::utils::{ConnectionError, Result};

pub struct SentinelProbe<'a> {
    address: NodeAddress,
    attempts: Vec<Option<&'a AuthConfig>>,
}

impl<'a> SentinelProbe<'a> {
    /// Probe the sentinel port on the target's host
    pub fn from_config(config: &'a DetectConfig) -> Self {
        Self::new(
            config.sentinel_address(),
            config.sentinel_auth.as_ref(),
            config.auth.as_ref(),
        )
    }

    pub fn new(
        address: NodeAddress,
        sentinel_auth: Option<&'a AuthConfig>,
        primary_auth: Option<&'a AuthConfig>,
    ) -> Self {
        let mut attempts = vec![sentinel_auth];
        if primary_auth != sentinel_auth {
            attempts.push(primary_auth);
        }
        Self { address, attempts }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Whether a sentinel answers PING at the probe address
    ///
    /// The first attempt decides presence: an unreachable endpoint means
    /// no sentinel layer and yields `false`. An authentication rejection
    /// moves on to the next credential; any failure on that later attempt
    /// is returned as an error.
    pub fn probe(&self, factory: &dyn ClientFactory, sink: &mut dyn EventSink) -> Result<bool> {
        let last = self.attempts.len() - 1;

        for (i, auth) in self.attempts.iter().enumerate() {
            match self.ping_with(factory, *auth) {
                Ok(()) => {
                    sink.emit(DetectEvent::SentinelProbed {
                        address: self.address.clone(),
                        found: true,
                    });
                    return Ok(true);
                }
                Err(e) if e.is_auth() && i < last => continue,
                Err(e) if e.is_unreachable() && i == 0 => {
                    sink.emit(DetectEvent::SentinelProbed {
                        address: self.address.clone(),
                        found: false,
                    });
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        }

        unreachable!("attempt list is never empty")
    }

    fn ping_with(
        &self,
        factory: &dyn ClientFactory,
        auth: Option<&AuthConfig>,
    ) -> std::result::Result<(), ConnectionError> {
        factory.connect(&self.address, auth)?.ping()
    }
}
