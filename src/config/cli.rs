//! Command-line argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Detect Valkey/Redis deployment topology and verify replica consistency
#[derive(Parser, Debug, Clone)]
#[command(name = "valkey-topology-check")]
#[command(version, about, long_about = None)]
#[command(disable_help_flag = true)]
pub struct CliArgs {
    /// Print help information
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: (),

    // ===== Connection Options =====
    /// Primary hostname to inspect
    #[arg(short = 'h', long = "host", default_value = "127.0.0.1")]
    pub host: String,

    /// Primary port
    #[arg(short = 'p', long = "port", default_value_t = 6379)]
    pub port: u16,

    /// Password for AUTH command
    #[arg(short = 'a', long = "auth")]
    pub password: Option<String>,

    /// Username for ACL AUTH (requires --auth)
    #[arg(long = "user")]
    pub username: Option<String>,

    // ===== Sentinel Options =====
    /// Port the sentinel layer listens on, on the same host
    #[arg(long = "sentinel-port", default_value_t = 26379)]
    pub sentinel_port: u16,

    /// Sentinel password (falls back to --auth on rejection)
    #[arg(long = "sentinel-auth")]
    pub sentinel_password: Option<String>,

    // ===== Probe Options =====
    /// Skip the write/read consistency probe
    #[arg(long = "no-verify")]
    pub no_verify: bool,

    /// Number of probe keys written in cluster mode
    #[arg(long = "cluster-keys", default_value_t = 20)]
    pub cluster_keys: u32,

    /// Probe key expiry in seconds
    #[arg(long = "probe-ttl", default_value_t = 1)]
    pub probe_ttl_secs: u64,

    /// Length of the random probe value
    #[arg(long = "value-length", default_value_t = 50)]
    pub value_length: usize,

    /// Probe key name (cluster keys get a numeric suffix)
    #[arg(long = "key-prefix", default_value = "test_key")]
    pub key_prefix: String,

    // ===== Timing Options =====
    /// Connection timeout in milliseconds
    #[arg(long = "connect-timeout", default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[arg(long = "request-timeout", default_value_t = 30000)]
    pub request_timeout_ms: u64,

    // ===== Output Options =====
    /// Output format
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Write the JSON report to this file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format for the final report
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_some() && self.password.is_none() {
            return Err("--user requires --auth to be set".to_string());
        }

        if self.cluster_keys == 0 {
            return Err("--cluster-keys must be at least 1".to_string());
        }

        if self.probe_ttl_secs == 0 {
            return Err("--probe-ttl must be at least 1 second".to_string());
        }

        if self.value_length == 0 {
            return Err("--value-length must be at least 1".to_string());
        }

        if self.key_prefix.is_empty() || self.key_prefix.contains(['*', '?', '[']) {
            return Err("--key-prefix must be a non-empty literal key name".to_string());
        }

        Ok(())
    }
}
