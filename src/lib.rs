//! A rule-driven, lazily realized model registry.
//!
//! Rules either create a named model element or mutate an existing one.
//! Rule sources are applied at a scope, which decides how their path and
//! type references bind. Nothing runs until an element is requested; then
//! its creation rule, its mutation rules (in declaration order) and,
//! transitively, their inputs are realized depth first.

pub mod addressing;
pub mod analysis;
pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod registry;
pub mod rules;
pub mod validation;

// Re-export key types for convenient access
pub use addressing::{Path, TypeToken};
pub use config::{RegistryOptions, SearchDepth};
pub use error::{ActionError, ModelError, ModelErrorKind, ModelRuleExecutionError, ScopeViolation};
pub use graph::{ModelValue, NodeState};
pub use registry::{ModelRegistry, NodeHandle, NodeInit, NodeRegistration};
pub use rules::{ModelReference, RuleContext, RuleDescriptor, RuleKind, RuleRegistration, RuleSource};
pub use validation::{ValidationError, ValidationErrorType};
