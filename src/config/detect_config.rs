//! Detection configuration derived from CLI arguments

use super::cli::{CliArgs, OutputFormat};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Host and port of a reachable store endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse "host:port", splitting on the last colon
    pub fn parse(s: &str) -> Option<Self> {
        let (host, port) = s.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port.parse().ok()?))
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Credential presented with AUTH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub password: String,
    pub username: Option<String>,
}

impl AuthConfig {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            username: None,
        }
    }
}

/// Consistency probe parameters
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Key written in plain modes; prefix of the cluster keys
    pub key: String,
    pub value_length: usize,
    pub ttl_secs: u64,
    pub cluster_keys: u32,
}

impl ProbeConfig {
    /// Name of the i-th cluster probe key
    pub fn cluster_key(&self, index: u32) -> String {
        format!("{}_{}", self.key, index)
    }

    /// SCAN pattern matching every cluster probe key
    pub fn cluster_pattern(&self) -> String {
        format!("{}*", self.key)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            key: "test_key".to_string(),
            value_length: 50,
            ttl_secs: 1,
            cluster_keys: 20,
        }
    }
}

/// Complete detection configuration
#[derive(Debug, Clone)]
pub struct DetectConfig {
    pub target: NodeAddress,
    pub auth: Option<AuthConfig>,
    pub sentinel_port: u16,
    pub sentinel_auth: Option<AuthConfig>,
    pub verify: bool,
    pub probe: ProbeConfig,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub output_format: OutputFormat,
    pub output_path: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

impl DetectConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        let auth = args.password.as_ref().map(|p| AuthConfig {
            password: p.clone(),
            username: args.username.clone(),
        });

        Ok(Self {
            target: NodeAddress::new(args.host.clone(), args.port),
            auth,
            sentinel_port: args.sentinel_port,
            sentinel_auth: args.sentinel_password.as_deref().map(AuthConfig::password),
            verify: !args.no_verify,
            probe: ProbeConfig {
                key: args.key_prefix.clone(),
                value_length: args.value_length,
                ttl_secs: args.probe_ttl_secs,
                cluster_keys: args.cluster_keys,
            },
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            output_format: args.output_format,
            output_path: args.output.clone(),
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }

    /// Minimal configuration against one target, defaults elsewhere
    pub fn for_target(target: NodeAddress) -> Self {
        Self {
            target,
            auth: None,
            sentinel_port: 26379,
            sentinel_auth: None,
            verify: true,
            probe: ProbeConfig::default(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            output_format: OutputFormat::Text,
            output_path: None,
            quiet: false,
            verbose: false,
        }
    }

    /// Address of the sentinel endpoint probed on the target host
    pub fn sentinel_address(&self) -> NodeAddress {
        NodeAddress::new(self.target.host.clone(), self.sentinel_port)
    }
}
