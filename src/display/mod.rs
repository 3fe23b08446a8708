//! Human- and machine-readable views of a registry.
pub mod snapshot;
pub mod trace;

pub use snapshot::{NodeReport, RegistrySnapshot, RuleReport};
pub use trace::format_tree;
