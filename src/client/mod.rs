//! Client connection layer

pub mod control_plane;
pub mod info;
pub mod raw_connection;
pub mod store_client;

#[cfg(test)]
pub(crate) mod mock;

pub use control_plane::ControlPlane;
pub use info::{NodeRole, ReplicaEntry, ServerInfo};
pub use raw_connection::RawConnection;
pub use store_client::{ClientFactory, ConnectionFactory, NodeClient, StoreClient};
