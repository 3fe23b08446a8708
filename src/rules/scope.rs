//! Applying a rule source at a scope node.
//!
//! Applying only rewrites references: relative paths become absolute under
//! the scope, by-type subjects search the scope, by-type inputs search the
//! scope enclosing the apply call. Nothing is checked here; legality is
//! verified lazily by [`check_legality`] when the affected node is realized,
//! so that applying stays side-effect free and order independent.

use super::registration::{ModelReference, RuleAction, RuleDescriptor, RuleKind, RuleSource};
use crate::addressing::{Path, TypeToken};
use crate::error::ScopeViolation;
use std::fmt;

/// A reference after scope rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Path(Path),
    Type { type_token: TypeToken, root: Path },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(path) => write!(f, "{}", path),
            Target::Type { type_token, root } => write!(f, "<{}> under {}", type_token, root),
        }
    }
}

/// A rule stamped with its scope and declaration order.
#[derive(Clone)]
pub struct ScopedRule {
    pub descriptor: RuleDescriptor,
    pub kind: RuleKind,
    pub subject: Target,
    /// Declared type of the subject, used when a creation rule synthesizes its node.
    pub subject_type: Option<TypeToken>,
    pub inputs: Vec<Target>,
    pub action: RuleAction,
    pub declaration_order: u64,
    pub scope: Path,
    pub has_external_dependencies: bool,
}

impl fmt::Debug for ScopedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedRule")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .field("subject", &self.subject)
            .field("inputs", &self.inputs)
            .field("declaration_order", &self.declaration_order)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

pub struct ScopeApplicator {
    scope: Path,
    enclosing: Path,
}

impl ScopeApplicator {
    /// `scope` is where the source applies; `enclosing` is the scope active
    /// where `apply` itself was invoked.
    pub fn new(scope: Path, enclosing: Path) -> Self {
        Self { scope, enclosing }
    }

    pub fn scope(&self) -> &Path {
        &self.scope
    }

    /// Stamps every rule of `source`, drawing declaration orders from `next_order`.
    pub fn apply(&self, source: RuleSource, next_order: &mut u64) -> Vec<ScopedRule> {
        source
            .rules
            .into_iter()
            .map(|rule| {
                let order = *next_order;
                *next_order += 1;
                ScopedRule {
                    descriptor: RuleDescriptor { source: source.name.clone(), rule: rule.name.clone() },
                    kind: rule.kind,
                    subject_type: rule.subject.type_token().cloned(),
                    subject: self.target(&rule.subject, &self.scope),
                    inputs: rule.inputs.iter().map(|i| self.target(i, &self.enclosing)).collect(),
                    action: rule.action,
                    declaration_order: order,
                    scope: self.scope.clone(),
                    has_external_dependencies: rule.has_external_dependencies,
                }
            })
            .collect()
    }

    fn target(&self, reference: &ModelReference, search_root: &Path) -> Target {
        match reference {
            ModelReference::Path { path, absolute: true, .. } => Target::Path(path.clone()),
            ModelReference::Path { path, absolute: false, .. } => {
                Target::Path(Path::resolve_relative(&self.scope, path))
            }
            ModelReference::Type { type_token } => {
                Target::Type { type_token: type_token.clone(), root: search_root.clone() }
            }
        }
    }
}

/// Rejects rules that may only be applied at the root scope.
pub fn check_legality(rule: &ScopedRule) -> Result<(), ScopeViolation> {
    if rule.scope.is_root() {
        return Ok(());
    }
    if rule.has_external_dependencies {
        return Err(ScopeViolation::ExternalDependencies {
            source_name: rule.descriptor.source.to_string(),
            scope: rule.scope.clone(),
        });
    }
    if rule.kind == RuleKind::Create {
        return Err(ScopeViolation::CreationRule { rule: rule.descriptor.clone(), scope: rule.scope.clone() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleRegistration;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn source() -> RuleSource {
        RuleSource::new("Rules")
            .rule(
                RuleRegistration::mutate("first", ModelReference::path(p("first")))
                    .input(ModelReference::of_type(TypeToken::named("Integer")))
                    .input(ModelReference::absolute(p("config"))),
            )
            .rule(RuleRegistration::mutate("byType", ModelReference::of_type(TypeToken::named("Mutable"))))
    }

    #[test]
    fn test_paths_rewritten_and_roots_asymmetric() {
        let mut order = 10;
        let rules = ScopeApplicator::new(p("values"), Path::root()).apply(source(), &mut order);

        assert_eq!(rules[0].subject, Target::Path(p("values.first")));
        assert_eq!(rules[0].inputs[0], Target::Type { type_token: TypeToken::named("Integer"), root: Path::root() });
        assert_eq!(rules[0].inputs[1], Target::Path(p("config")));
        assert_eq!(rules[1].subject, Target::Type { type_token: TypeToken::named("Mutable"), root: p("values") });
        assert_eq!((rules[0].declaration_order, rules[1].declaration_order), (10, 11));
        assert_eq!(order, 12);
    }

    #[test]
    fn test_legality_only_restricts_non_root_scopes() {
        let create = RuleSource::new("Creator")
            .rule(RuleRegistration::create("string", p("string"), TypeToken::named("String")));
        let mut order = 0;

        let at_root = ScopeApplicator::new(Path::root(), Path::root()).apply(create.clone(), &mut order);
        assert!(check_legality(&at_root[0]).is_ok());

        let scoped = ScopeApplicator::new(p("values"), Path::root()).apply(create, &mut order);
        let err = check_legality(&scoped[0]).unwrap_err();
        assert!(matches!(err, ScopeViolation::CreationRule { .. }));
        assert!(err.to_string().starts_with("Rule Creator.string cannot be applied at the scope of model element values"));
    }

    #[test]
    fn test_dependencies_reported_before_creation() {
        let source = RuleSource::new("WithDeps").rule(
            RuleRegistration::create("thing", p("thing"), TypeToken::named("Thing")).with_external_dependencies(),
        );
        let rules = ScopeApplicator::new(p("values"), Path::root()).apply(source, &mut 0);
        assert_eq!(
            check_legality(&rules[0]).unwrap_err().to_string(),
            "Rule source WithDeps cannot have plugin dependencies."
        );
    }
}
