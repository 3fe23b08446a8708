//! The view of the model a running rule action gets.

use super::registration::RuleSource;
use crate::addressing::Path;
use crate::error::ActionError;
use crate::graph::ModelValue;
use crate::registry::NodeRegistration;
use std::any::Any;
use thiserror::Error;

/// Failures of the typed accessors on [`RuleContext`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Rule has no input at position {0}.")]
    MissingInput(usize),
    #[error("Model element '{0}' has no value.")]
    Null(Path),
    #[error("Model element '{path}' holds a '{actual}', not a '{expected}'.")]
    WrongType { path: Path, expected: &'static str, actual: &'static str },
}

/// Registry changes requested by an action. They run after the action returns.
pub(crate) enum Deferred {
    AddChild { name: String, registration: NodeRegistration },
    Apply { scope: Path, source: RuleSource },
}

pub struct RuleContext<'a> {
    subject_path: &'a Path,
    subject: &'a mut Option<ModelValue>,
    inputs: Vec<(&'a Path, Option<&'a ModelValue>)>,
    deferred: Vec<Deferred>,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn new(
        subject_path: &'a Path,
        subject: &'a mut Option<ModelValue>,
        inputs: Vec<(&'a Path, Option<&'a ModelValue>)>,
    ) -> Self {
        Self { subject_path, subject, inputs, deferred: Vec::new() }
    }

    pub fn path(&self) -> &Path {
        self.subject_path
    }

    pub fn subject<T: Any>(&self) -> Result<&T, ActionError> {
        let value = self.subject.as_ref().ok_or_else(|| ContextError::Null(self.subject_path.clone()))?;
        downcast(self.subject_path, value)
    }

    pub fn subject_mut<T: Any>(&mut self) -> Result<&mut T, ActionError> {
        let path = self.subject_path;
        let value = self.subject.as_mut().ok_or_else(|| ContextError::Null(path.clone()))?;
        let actual = value.type_name();
        value.downcast_mut::<T>().ok_or_else(|| {
            ContextError::WrongType { path: path.clone(), expected: std::any::type_name::<T>(), actual }.into()
        })
    }

    /// Replaces the subject value; creation rules use this to produce it.
    pub fn set_subject<T: Any>(&mut self, value: T) {
        *self.subject = Some(ModelValue::new(value));
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_path(&self, index: usize) -> Option<&Path> {
        self.inputs.get(index).map(|(p, _)| *p)
    }

    pub fn input_value(&self, index: usize) -> Option<&ModelValue> {
        self.inputs.get(index).and_then(|(_, v)| *v)
    }

    pub fn input<T: Any>(&self, index: usize) -> Result<&T, ActionError> {
        let (path, value) = *self.inputs.get(index).ok_or(ContextError::MissingInput(index))?;
        let value = value.ok_or_else(|| ContextError::Null(path.clone()))?;
        downcast(path, value)
    }

    /// Registers a child of the subject once the action has returned.
    pub fn add_child(&mut self, name: &str, registration: NodeRegistration) {
        self.deferred.push(Deferred::AddChild { name: name.to_string(), registration });
    }

    /// Applies `source` at a scope relative to the subject once the action
    /// has returned. By-type inputs of `source` search from this rule's scope.
    pub fn apply(&mut self, relative: &Path, source: RuleSource) {
        let scope = Path::resolve_relative(self.subject_path, relative);
        self.deferred.push(Deferred::Apply { scope, source });
    }

    pub(crate) fn into_deferred(self) -> Vec<Deferred> {
        self.deferred
    }
}

fn downcast<'v, T: Any>(path: &Path, value: &'v ModelValue) -> Result<&'v T, ActionError> {
    value.downcast_ref::<T>().ok_or_else(|| {
        ContextError::WrongType { path: path.clone(), expected: std::any::type_name::<T>(), actual: value.type_name() }
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access_to_subject_and_inputs() {
        let subject_path = Path::parse("values.first").unwrap();
        let input_path = Path::parse("count").unwrap();
        let input = ModelValue::new(3_i64);
        let mut subject = Some(ModelValue::new(String::from("a")));

        let mut ctx = RuleContext::new(&subject_path, &mut subject, vec![(&input_path, Some(&input))]);
        let n = *ctx.input::<i64>(0).unwrap();
        ctx.subject_mut::<String>().unwrap().push_str(&n.to_string());
        assert!(ctx.input::<String>(0).is_err());
        assert!(ctx.input::<i64>(1).is_err());
        drop(ctx);

        assert_eq!(subject.unwrap().downcast_ref::<String>().map(String::as_str), Some("a3"));
    }

    #[test]
    fn test_null_subject_reports_path() {
        let path = Path::parse("values").unwrap();
        let mut subject = None;
        let ctx = RuleContext::new(&path, &mut subject, Vec::new());
        let err = ctx.subject::<String>().unwrap_err();
        assert_eq!(err.to_string(), "Model element 'values' has no value.");
    }
}
