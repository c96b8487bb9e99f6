//! Utility modules

pub mod error;
pub mod resp;

pub use error::{ClusterError, ConnectionError, DetectError, ProtocolError, Result};
pub use resp::{RespDecoder, RespEncoder, RespValue};
