//! Defines the error types for the validation module.
use crate::rules::RuleDescriptor;

/// The specific category of a validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorType {
    /// A subject or input that no registered or declared element satisfies.
    Unbound,
    /// A by-type reference matching several elements.
    Ambiguous,
    /// A rule applied at a scope it may not be applied at.
    ScopeViolation,
    /// Rules whose inputs depend on each other's subjects.
    Cycle,
    /// A rule registered after its subject collected its mutation rules.
    Late,
}

/// A structured report from the static validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The rule the problem was found in, when it belongs to one rule.
    pub rule: Option<RuleDescriptor>,
    /// The category of the error.
    pub error_type: ValidationErrorType,
    /// A human-readable message explaining the error.
    pub message: String,
}
