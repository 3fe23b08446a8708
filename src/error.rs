//! Error taxonomy for binding, scoping and realization failures.
use crate::addressing::{Path, TypeToken};
use crate::graph::NodeState;
use crate::rules::RuleDescriptor;
use thiserror::Error;

/// The error type returned by rule actions.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The coarse category of a [`ModelError`].
///
/// Callers match on this instead of on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelErrorKind {
    Absence,
    Ambiguity,
    Cycle,
    ScopeViolation,
    ExecutionFailure,
    TypeMismatch,
    Registration,
}

/// A rule applied somewhere it is not allowed to run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeViolation {
    #[error("Rule {rule} cannot be applied at the scope of model element {scope} as creation rules cannot be used when applying rule sources to particular elements.")]
    CreationRule { rule: RuleDescriptor, scope: Path },
    #[error("Rule source {source_name} cannot have plugin dependencies.")]
    ExternalDependencies { source_name: String, scope: Path },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No model element at '{path}'.")]
    NoElementAtPath { path: Path },
    #[error("No model element of type '{type_token}' found under '{root}'.")]
    NoElementOfType { type_token: TypeToken, root: Path },
    #[error("Model element '{path}' has no value.")]
    NullValue { path: Path },
    #[error("Type-only model reference of type '{type_token}' is ambiguous as multiple model elements are available under '{root}': {}", join_paths(.candidates))]
    Ambiguous { type_token: TypeToken, root: Path, candidates: Vec<Path> },
    #[error("A cycle has been detected in model rule dependencies. References forming the cycle: {}", join_chain(.chain))]
    Cycle { chain: Vec<Path> },
    #[error(transparent)]
    ScopeViolation(#[from] ScopeViolation),
    #[error("Exception thrown while executing model rule: {rule}: {source}")]
    ExecutionFailure { rule: RuleDescriptor, source: ActionError },
    #[error("Model element '{path}' of type '{declared}' cannot be viewed as '{requested}'.")]
    TypeMismatch { path: Path, declared: String, requested: String },
    #[error("Cannot register model element '{path}' as it is already registered.")]
    DuplicateRegistration { path: Path },
    #[error("Cannot register model element '{path}' as its parent '{parent}' is not registered.")]
    MissingParent { path: Path, parent: Path },
    #[error("Model element '{path}' has more than one creation rule: {}", join_rules(.rules))]
    DuplicateCreator { path: Path, rules: Vec<RuleDescriptor> },
    #[error("Cannot add rule {rule} for model element '{path}' at state {state:?}.")]
    LateRule { rule: RuleDescriptor, path: Path, state: NodeState },
}

impl ModelError {
    pub fn kind(&self) -> ModelErrorKind {
        match self {
            Self::NoElementAtPath { .. } | Self::NoElementOfType { .. } | Self::NullValue { .. } => ModelErrorKind::Absence,
            Self::Ambiguous { .. } => ModelErrorKind::Ambiguity,
            Self::Cycle { .. } => ModelErrorKind::Cycle,
            Self::ScopeViolation(_) => ModelErrorKind::ScopeViolation,
            Self::ExecutionFailure { .. } => ModelErrorKind::ExecutionFailure,
            Self::TypeMismatch { .. } => ModelErrorKind::TypeMismatch,
            Self::DuplicateRegistration { .. }
            | Self::MissingParent { .. }
            | Self::DuplicateCreator { .. }
            | Self::LateRule { .. } => ModelErrorKind::Registration,
        }
    }

    /// A suggested fix, where one is known.
    pub fn resolution(&self) -> Option<&'static str> {
        match self {
            Self::ScopeViolation(ScopeViolation::CreationRule { .. }) => {
                Some("Declare creation rules in a rule source applied at the root scope.")
            }
            Self::ScopeViolation(ScopeViolation::ExternalDependencies { .. }) => {
                Some("Apply rule sources with plugin dependencies at the root scope.")
            }
            Self::Ambiguous { .. } => Some("Reference the element by path instead of by type."),
            Self::Cycle { .. } => Some("Remove one of the rule inputs forming the cycle."),
            Self::LateRule { .. } => Some("Register rules before the model element is first realized."),
            _ => None,
        }
    }
}

/// The single error surfaced by realization. The original failure is kept
/// unchanged as [`ModelRuleExecutionError::cause`].
#[derive(Error, Debug)]
#[error("Failed to realize model element '{path}'{}", rule_suffix(.rule))]
pub struct ModelRuleExecutionError {
    pub path: Path,
    pub rule: Option<RuleDescriptor>,
    #[source]
    cause: ModelError,
}

impl ModelRuleExecutionError {
    pub(crate) fn new(path: Path, rule: Option<RuleDescriptor>, cause: ModelError) -> Self {
        Self { path, rule, cause }
    }

    pub fn cause(&self) -> &ModelError {
        &self.cause
    }

    pub fn kind(&self) -> ModelErrorKind {
        self.cause.kind()
    }

    pub fn into_cause(self) -> ModelError {
        self.cause
    }
}

fn rule_suffix(rule: &Option<RuleDescriptor>) -> String {
    match rule {
        Some(rule) => format!(" while executing model rule {}", rule),
        None => String::new(),
    }
}

fn join_paths(paths: &[Path]) -> String {
    paths.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

fn join_chain(chain: &[Path]) -> String {
    chain.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" -> ")
}

fn join_rules(rules: &[RuleDescriptor]) -> String {
    rules.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}
