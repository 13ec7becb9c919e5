//! Graph mutation operations — pure functions over nodes and edges.

pub mod connection;
pub mod factory;
pub mod mutation;
pub mod placement;
pub mod references;

pub use connection::{check_connection, validate_connection};
pub use factory::{create_edge_between_nodes, create_node};
pub use mutation::{delete_edge, delete_node};
pub use placement::{find_empty_position, PlacementConfig};
pub use references::prune_dangling_references;
