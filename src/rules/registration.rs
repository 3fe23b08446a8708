//! Rule descriptors as handed over by the rule extraction step.

use super::context::RuleContext;
use crate::addressing::{Path, TypeToken};
use crate::error::ActionError;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// The executable part of a rule.
pub type RuleAction = Rc<dyn Fn(&mut RuleContext<'_>) -> Result<(), ActionError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Produces the initial value of its subject. At most one per node.
    Create,
    /// Transforms an already created value.
    Mutate,
}

/// Human readable identity of a rule, `<source>.<rule>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleDescriptor {
    pub source: Arc<str>,
    pub rule: Arc<str>,
}

impl RuleDescriptor {
    pub fn new(source: &str, rule: &str) -> Self {
        Self { source: Arc::from(source), rule: Arc::from(rule) }
    }
}

impl fmt::Display for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.rule)
    }
}

/// How a rule refers to a model element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReference {
    /// An explicit path. Relative paths resolve against the scope the rule
    /// source is applied at.
    Path { path: Path, absolute: bool, type_token: Option<TypeToken> },
    /// The single element of a given type below the search root.
    Type { type_token: TypeToken },
}

impl ModelReference {
    pub fn path(path: Path) -> Self {
        Self::Path { path, absolute: false, type_token: None }
    }

    pub fn absolute(path: Path) -> Self {
        Self::Path { path, absolute: true, type_token: None }
    }

    pub fn of_type(type_token: TypeToken) -> Self {
        Self::Type { type_token }
    }

    pub fn typed<T: ?Sized + 'static>() -> Self {
        Self::of_type(TypeToken::of::<T>())
    }

    /// Declares the expected type of a by-path reference.
    pub fn with_type(self, declared: TypeToken) -> Self {
        match self {
            Self::Path { path, absolute, .. } => Self::Path { path, absolute, type_token: Some(declared) },
            Self::Type { .. } => Self::Type { type_token: declared },
        }
    }

    pub fn type_token(&self) -> Option<&TypeToken> {
        match self {
            Self::Path { type_token, .. } => type_token.as_ref(),
            Self::Type { type_token } => Some(type_token),
        }
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { path, .. } => write!(f, "{}", path),
            Self::Type { type_token } => write!(f, "<{}>", type_token),
        }
    }
}

/// One rule of a rule source, before it is applied at a scope.
#[derive(Clone)]
pub struct RuleRegistration {
    pub kind: RuleKind,
    pub name: Arc<str>,
    pub subject: ModelReference,
    pub inputs: Vec<ModelReference>,
    pub action: RuleAction,
    pub has_external_dependencies: bool,
}

impl RuleRegistration {
    /// A creation rule producing a `type_token` value at `path`.
    pub fn create(name: &str, path: Path, type_token: TypeToken) -> Self {
        Self::new(RuleKind::Create, name, ModelReference::path(path).with_type(type_token))
    }

    pub fn mutate(name: &str, subject: ModelReference) -> Self {
        Self::new(RuleKind::Mutate, name, subject)
    }

    fn new(kind: RuleKind, name: &str, subject: ModelReference) -> Self {
        Self {
            kind,
            name: Arc::from(name),
            subject,
            inputs: Vec::new(),
            action: Rc::new(no_op),
            has_external_dependencies: false,
        }
    }

    pub fn input(mut self, input: ModelReference) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut RuleContext<'_>) -> Result<(), ActionError> + 'static,
    {
        self.action = Rc::new(action);
        self
    }

    pub fn with_external_dependencies(mut self) -> Self {
        self.has_external_dependencies = true;
        self
    }
}

fn no_op(_: &mut RuleContext<'_>) -> Result<(), ActionError> {
    Ok(())
}

impl fmt::Debug for RuleRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistration")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("subject", &self.subject)
            .field("inputs", &self.inputs)
            .field("has_external_dependencies", &self.has_external_dependencies)
            .finish_non_exhaustive()
    }
}

/// A named, ordered batch of rules applied together.
#[derive(Debug, Clone)]
pub struct RuleSource {
    pub name: Arc<str>,
    pub rules: Vec<RuleRegistration>,
}

impl RuleSource {
    pub fn new(name: &str) -> Self {
        Self { name: Arc::from(name), rules: Vec::new() }
    }

    pub fn rule(mut self, rule: RuleRegistration) -> Self {
        self.rules.push(rule);
        self
    }
}
