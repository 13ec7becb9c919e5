//! Domain models shared across the whole editor backend.

pub mod graph;
pub mod position;
pub mod strategy;

pub use graph::{
    Connection, Edge, EdgeId, GraphSnapshot, Node, NodeData, NodeId, NodeKind, MAX_COORDINATE, XY,
};
pub use position::Position;
pub use strategy::{NewStrategy, Strategy, StrategyRow, StrategyUpdate};
