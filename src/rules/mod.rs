//! Rules: descriptors, scope application, binding and the action context.
pub mod binder;
pub mod context;
pub mod registration;
pub mod scope;

pub use binder::{Role, RuleBinder};
pub use context::{ContextError, RuleContext};
pub use registration::{ModelReference, RuleAction, RuleDescriptor, RuleKind, RuleRegistration, RuleSource};
pub use scope::{check_legality, ScopeApplicator, ScopedRule, Target};

/// Index of a rule in the registry's rule store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RuleId(pub u32);

impl RuleId {
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}
