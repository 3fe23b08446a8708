//! The model registry: owns the node graph and the rules, and drives
//! realization.
//!
//! Registration (`register`, `apply`, `mutate`) never runs a rule. Rules run
//! only when a node is requested through `get`/`realize`, depth first, in
//! declaration order per node.

mod realize;
pub mod store;

use crate::addressing::{Path, TypeToken};
use crate::config::RegistryOptions;
use crate::display::RegistrySnapshot;
use crate::error::{ActionError, ModelError, ModelRuleExecutionError};
use crate::graph::{ModelValue, Node, NodeArena, NodeId, NodeState};
use crate::rules::{
    ModelReference, Role, RuleAction, RuleBinder, RuleContext, RuleDescriptor, RuleId, RuleKind, RuleSource,
    ScopeApplicator, ScopedRule, Target,
};
use crate::validation::{ValidationError, Validator};
use std::any::Any;
use std::rc::Rc;
use store::RuleStore;

/// Source name used for rules the registry creates on behalf of callers.
const REGISTRY_SOURCE: &str = "ModelRegistry";

/// How a registered node gets its initial value.
pub enum NodeInit {
    /// A value supplied up front; `None` registers a null element.
    Value(Option<ModelValue>),
    /// A creation rule run on first realization.
    Creator { inputs: Vec<ModelReference>, action: RuleAction },
}

/// Everything `register` needs besides the path.
pub struct NodeRegistration {
    pub type_token: TypeToken,
    pub init: NodeInit,
}

impl NodeRegistration {
    /// Registers `value`, declaring its Rust type.
    pub fn instance<T: Any>(value: T) -> Self {
        Self::value(TypeToken::of::<T>(), value)
    }

    pub fn value<T: Any>(type_token: TypeToken, value: T) -> Self {
        Self { type_token, init: NodeInit::Value(Some(ModelValue::new(value))) }
    }

    pub fn null(type_token: TypeToken) -> Self {
        Self { type_token, init: NodeInit::Value(None) }
    }

    pub fn creator<F>(type_token: TypeToken, action: F) -> Self
    where
        F: Fn(&mut RuleContext<'_>) -> Result<(), ActionError> + 'static,
    {
        Self { type_token, init: NodeInit::Creator { inputs: Vec::new(), action: Rc::new(action) } }
    }

    /// Adds an input to a creator registration. Ignored for plain values.
    pub fn input(mut self, input: ModelReference) -> Self {
        if let NodeInit::Creator { inputs, .. } = &mut self.init {
            inputs.push(input);
        }
        self
    }
}

/// A registered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub id: NodeId,
    pub path: Path,
}

/// Owns the model graph. One registry per configuration phase.
///
/// Single-threaded by construction: rule actions are shared through `Rc`.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    pub(crate) nodes: NodeArena,
    pub(crate) rules: RuleStore,
    pub(crate) options: RegistryOptions,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        self.nodes.lookup(path).map(|id| self.nodes.get(id))
    }

    pub fn state(&self, path: &Path) -> Option<NodeState> {
        self.node(path).map(|n| n.state)
    }

    /// Registers a node at `path`. The parent must already be registered.
    pub fn register(&mut self, path: &Path, registration: NodeRegistration) -> Result<NodeHandle, ModelError> {
        let parent_path = path.parent().ok_or_else(|| ModelError::DuplicateRegistration { path: path.clone() })?;
        if self.nodes.lookup(path).is_some() {
            return Err(ModelError::DuplicateRegistration { path: path.clone() });
        }
        let parent = self
            .nodes
            .lookup(&parent_path)
            .ok_or_else(|| ModelError::MissingParent { path: path.clone(), parent: parent_path.clone() })?;

        let NodeRegistration { type_token, init } = registration;
        let id = self.nodes.insert(parent, path.clone(), type_token.clone());
        match init {
            NodeInit::Value(value) => {
                let node = self.nodes.get_mut(id);
                node.value = value;
                node.advance(NodeState::Created);
            }
            NodeInit::Creator { inputs, action } => {
                let rule = ScopedRule {
                    descriptor: RuleDescriptor::new(REGISTRY_SOURCE, &format!("register({})", path)),
                    kind: RuleKind::Create,
                    subject: Target::Path(path.clone()),
                    subject_type: Some(type_token),
                    inputs: inputs.iter().map(root_target).collect(),
                    action,
                    declaration_order: self.take_order(),
                    scope: Path::root(),
                    has_external_dependencies: false,
                };
                let rule_id = self.add_rule(rule);
                self.nodes.get_mut(id).creator = Some(rule_id);
            }
        }
        tracing::debug!(path = %path, "registered model element");
        Ok(NodeHandle { id, path: path.clone() })
    }

    pub fn register_child(
        &mut self,
        parent: &NodeHandle,
        name: &str,
        registration: NodeRegistration,
    ) -> Result<NodeHandle, ModelError> {
        self.register(&parent.path.child(name), registration)
    }

    /// Applies `source` at `scope`. Nothing is bound or checked until realization.
    pub fn apply(&mut self, scope: &Path, source: RuleSource) -> &mut Self {
        self.apply_within(scope.clone(), Path::root(), source);
        self
    }

    pub(crate) fn apply_within(&mut self, scope: Path, enclosing: Path, source: RuleSource) {
        let name = source.name.clone();
        let applicator = ScopeApplicator::new(scope, enclosing);
        let scoped = applicator.apply(source, self.rules.next_order_mut());
        tracing::debug!(source = %name, scope = %applicator.scope(), rules = scoped.len(), "applied rule source");
        for rule in scoped {
            self.add_rule(rule);
        }
    }

    /// Registers a single ad-hoc mutation of the element at `path`.
    pub fn mutate<F>(&mut self, path: &Path, action: F) -> &mut Self
    where
        F: Fn(&mut RuleContext<'_>) -> Result<(), ActionError> + 'static,
    {
        let rule = ScopedRule {
            descriptor: RuleDescriptor::new(REGISTRY_SOURCE, &format!("mutate({})", path)),
            kind: RuleKind::Mutate,
            subject: Target::Path(path.clone()),
            subject_type: None,
            inputs: Vec::new(),
            action: Rc::new(action),
            declaration_order: self.take_order(),
            scope: Path::root(),
            has_external_dependencies: false,
        };
        self.add_rule(rule);
        self
    }

    /// Realizes the element at `path` and returns it as a `T`.
    pub fn get<T: Any>(&mut self, path: &Path) -> Result<&T, ModelRuleExecutionError> {
        let id = self.realize_to(path, NodeState::Finalized)?;
        let node = self.nodes.get(id);
        let value = node
            .value
            .as_ref()
            .ok_or_else(|| ModelRuleExecutionError::new(path.clone(), None, ModelError::NullValue { path: path.clone() }))?;
        value.downcast_ref::<T>().ok_or_else(|| {
            ModelRuleExecutionError::new(
                path.clone(),
                None,
                ModelError::TypeMismatch {
                    path: path.clone(),
                    declared: value.type_name().to_string(),
                    requested: std::any::type_name::<T>().to_string(),
                },
            )
        })
    }

    /// Realizes the element at `path`, checking its declared type against `expected`.
    pub fn get_value(
        &mut self,
        path: &Path,
        expected: &TypeToken,
    ) -> Result<Option<&ModelValue>, ModelRuleExecutionError> {
        let id = self.realize_to(path, NodeState::Finalized)?;
        let node = self.nodes.get(id);
        if !node.type_token.is_assignable_to(expected) {
            return Err(ModelRuleExecutionError::new(
                path.clone(),
                None,
                ModelError::TypeMismatch {
                    path: path.clone(),
                    declared: node.type_token.to_string(),
                    requested: expected.to_string(),
                },
            ));
        }
        Ok(node.value.as_ref())
    }

    /// Drives the element at `path` to `Finalized`.
    pub fn realize(&mut self, path: &Path) -> Result<NodeHandle, ModelRuleExecutionError> {
        let id = self.realize_to(path, NodeState::Finalized)?;
        Ok(NodeHandle { id, path: path.clone() })
    }

    /// Binds every rule without running it and reports what would fail.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::new(self).validate()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::capture(self)
    }

    /// Stores `rule`. A rule whose subject already collected its mutation
    /// rules can never run; it is recorded on the node and fails its next
    /// realization.
    fn add_rule(&mut self, rule: ScopedRule) -> RuleId {
        let target = match &rule.subject {
            Target::Path(path) => self.nodes.lookup(path),
            Target::Type { .. } if rule.kind == RuleKind::Mutate => {
                RuleBinder::new(&self.nodes, self.rules.declared(), &self.options)
                    .bind(&rule.subject, Role::Subject)
                    .ok()
                    .and_then(|path| self.nodes.lookup(&path))
            }
            Target::Type { .. } => None,
        };
        let descriptor = rule.descriptor.clone();
        let id = self.rules.add(rule);
        if let Some(node_id) = target.filter(|n| self.nodes.get(*n).mutations_bound) {
            let node = self.nodes.get_mut(node_id);
            tracing::warn!(path = %node.path, rule = %descriptor, state = ?node.state, "rule added after its subject was realized");
            node.late_rules.push(id);
        }
        id
    }

    fn take_order(&mut self) -> u64 {
        let order = self.rules.next_order_mut();
        let current = *order;
        *order += 1;
        current
    }
}

/// Inputs of registry-owned rules resolve against the root.
fn root_target(reference: &ModelReference) -> Target {
    match reference {
        ModelReference::Path { path, .. } => Target::Path(path.clone()),
        ModelReference::Type { type_token } => Target::Type { type_token: type_token.clone(), root: Path::root() },
    }
}
