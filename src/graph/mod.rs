//! Defines the core data structures for the model graph.
pub mod node;
pub mod storage;

// Re-export key types for convenient access
pub use node::{ModelValue, Node, NodeState};
pub use storage::{NodeArena, NodeId};
