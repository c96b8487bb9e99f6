//! Error types for valkey-topology-check

use std::io;
use thiserror::Error;

use super::resp::RedirectKind;

/// Top-level detection error
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entry point did not answer PING
    #[error("Entry point {address} is unreachable: {source}")]
    Unreachable {
        address: String,
        source: ConnectionError,
    },

    /// Entry point reported `role:slave`
    #[error("Entry point {address} is a replica, point the check at a primary")]
    ReplicaEntryPoint { address: String },

    /// Probe value read back from the primary did not match what was written
    #[error("Write path check failed on {address}: key '{key}' read back {actual:?}")]
    WritePathMismatch {
        address: String,
        key: String,
        actual: Option<String>,
    },

    /// SET or GET against the primary failed outright
    #[error("Write path check failed on {address}: {source}")]
    WritePathFailed {
        address: String,
        source: ConnectionError,
    },

    /// A detector was handed a topology of another mode
    #[error("{mode} detector cannot verify a {found} topology")]
    TopologyMismatch { mode: String, found: &'static str },

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DetectError {
    /// Errors that terminate the whole run with nothing left to check
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DetectError::Unreachable { .. }
                | DetectError::ReplicaEntryPoint { .. }
                | DetectError::WritePathMismatch { .. }
                | DetectError::WritePathFailed { .. }
        )
    }
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Connection closed unexpectedly")]
    Closed,

    #[error("IO error: {0}")]
    Io(io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    /// Whether the server rejected our credentials (as opposed to not answering)
    pub fn is_auth(&self) -> bool {
        matches!(self, ConnectionError::AuthFailed(_))
    }

    /// Whether the endpoint could not be reached or dropped the connection
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ConnectionError::ConnectFailed { .. }
                | ConnectionError::Closed
                | ConnectionError::Io(_)
        )
    }
}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => ConnectionError::AuthFailed(e.to_string()),
            io::ErrorKind::UnexpectedEof => ConnectionError::Closed,
            _ => ConnectionError::Io(e),
        }
    }
}

/// RESP protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: String, actual: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("{kind:?} {slot} {host}:{port}")]
    Redirect {
        kind: RedirectKind,
        slot: u16,
        host: String,
        port: u16,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Cluster-related errors
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Failed to parse CLUSTER NODES response: {0}")]
    ParseFailed(String),

    #[error("No primary nodes found in cluster")]
    NoPrimaries,

    #[error("Slot {0} has no assigned node")]
    UnassignedSlot(u16),

    #[error("Too many redirects for key '{0}'")]
    TooManyRedirects(String),
}

pub type Result<T> = std::result::Result<T, DetectError>;
