//! Configuration module

pub mod cli;
pub mod detect_config;

pub use cli::{CliArgs, OutputFormat};
pub use detect_config::{AuthConfig, DetectConfig, NodeAddress, ProbeConfig};
