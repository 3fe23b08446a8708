//! Graph analyses over the rule bindings.
pub mod topology;

pub use topology::DependencyGraph;
