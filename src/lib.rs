//! valkey-topology-check library
//!
//! Classifies a Valkey/Redis deployment (standalone, replication,
//! sentinel-managed or cluster) from one entry point and verifies that
//! writes reach every replica.

pub mod client;
pub mod cluster;
pub mod config;
pub mod detect;
pub mod report;
pub mod utils;
pub mod verify;
