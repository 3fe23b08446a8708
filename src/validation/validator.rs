//! The validator that binds every rule up front, without running any.
use super::error::{ValidationError, ValidationErrorType};
use crate::addressing::Path;
use crate::analysis::topology::DependencyGraph;
use crate::error::{ModelError, ModelErrorKind};
use crate::registry::ModelRegistry;
use crate::rules::{check_legality, Role, RuleBinder, RuleKind, ScopedRule, Target};

/// Checks the whole registry the way realization would, but statically.
///
/// Only the graph as registered so far is visible: elements that rules add
/// while running are reported as unbound.
pub struct Validator<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// # Returns
    /// - `Ok(())` if every rule binds and the rule dependencies are acyclic.
    /// - `Err(Vec<ValidationError>)` with every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let registry = self.registry;
        let binder = RuleBinder::new(&registry.nodes, registry.rules.declared(), &registry.options);
        let mut errors = Vec::new();
        let mut dependencies = DependencyGraph::new();

        for (rule_id, rule) in registry.rules.iter() {
            if let Err(violation) = check_legality(rule) {
                errors.push(ValidationError {
                    rule: Some(rule.descriptor.clone()),
                    error_type: ValidationErrorType::ScopeViolation,
                    message: violation.to_string(),
                });
                continue;
            }
            if registry.rules.stray().contains(&rule_id) {
                errors.push(ValidationError {
                    rule: Some(rule.descriptor.clone()),
                    error_type: ValidationErrorType::Unbound,
                    message: format!("Creation rule {} must name its subject by path.", rule.descriptor),
                });
                continue;
            }

            let subject = match registry.rules.bound_to(rule_id) {
                Some(node) => Ok(registry.nodes.get(node).path.clone()),
                None => self.resolve(&binder, rule, &rule.subject, Role::Subject),
            };
            let inputs: Vec<Result<Path, ValidationError>> =
                rule.inputs.iter().map(|i| self.resolve(&binder, rule, i, Role::Input)).collect();

            match subject {
                Ok(subject) => {
                    for input in inputs {
                        match input {
                            Ok(input) => dependencies.add_dependency(&subject, &input, rule.descriptor.clone()),
                            Err(e) => errors.push(e),
                        }
                    }
                }
                Err(e) => {
                    errors.push(e);
                    errors.extend(inputs.into_iter().filter_map(Result::err));
                }
            }
        }

        for (_, node) in registry.nodes.iter() {
            for &rule_id in &node.late_rules {
                let rule = registry.rules.get(rule_id);
                errors.push(ValidationError {
                    rule: Some(rule.descriptor.clone()),
                    error_type: ValidationErrorType::Late,
                    message: ModelError::LateRule {
                        rule: rule.descriptor.clone(),
                        path: node.path.clone(),
                        state: node.state,
                    }
                    .to_string(),
                });
            }
        }

        for cycle in dependencies.cycles() {
            let chain = cycle.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
            errors.push(ValidationError {
                rule: None,
                error_type: ValidationErrorType::Cycle,
                message: format!("A cycle has been detected in model rule dependencies between: {}", chain),
            });
        }

        for error in &errors {
            tracing::warn!(kind = ?error.error_type, "{}", error.message);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn resolve(
        &self,
        binder: &RuleBinder<'_>,
        rule: &ScopedRule,
        target: &Target,
        role: Role,
    ) -> Result<Path, ValidationError> {
        let registry = self.registry;
        let to_error = |e: ModelError| ValidationError {
            rule: Some(rule.descriptor.clone()),
            error_type: match e.kind() {
                ModelErrorKind::Ambiguity => ValidationErrorType::Ambiguous,
                _ => ValidationErrorType::Unbound,
            },
            message: format!("{}: {}", rule.descriptor, e),
        };

        let path = binder.bind(target, role).map_err(to_error)?;
        let known = registry.nodes.lookup(&path).is_some() || !registry.rules.creators_at(&path).is_empty();
        // A creation rule is its own subject.
        if known || (role == Role::Subject && rule.kind == RuleKind::Create) {
            Ok(path)
        } else {
            Err(to_error(ModelError::NoElementAtPath { path }))
        }
    }
}
