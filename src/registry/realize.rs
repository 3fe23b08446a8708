//! Realization: drives a node and, transitively, its inputs to completion.
//!
//! Depth first and synchronous. `Walk::chain` holds the paths whose creation
//! or mutation is in progress on the current call stack; requesting one of
//! them again is a cycle. `Walk::closing` holds the nodes whose children are
//! being realized; such a node is already `Mutated` and is handed out as is.

use super::ModelRegistry;
use crate::addressing::{Path, TypeToken};
use crate::error::{ModelError, ModelRuleExecutionError};
use crate::graph::{NodeId, NodeState};
use crate::rules::context::Deferred;
use crate::rules::{check_legality, Role, RuleBinder, RuleContext, RuleDescriptor, RuleId, Target};

/// A failure on its way up the realization stack, tagged with the innermost
/// rule involved.
struct Failure {
    rule: Option<RuleDescriptor>,
    error: ModelError,
}

impl Failure {
    fn in_rule(rule: &RuleDescriptor, error: ModelError) -> Self {
        Self { rule: Some(rule.clone()), error }
    }

    /// Attributes the failure to `rule` unless a deeper rule already claimed it.
    fn or_rule(mut self, rule: &RuleDescriptor) -> Self {
        if self.rule.is_none() {
            self.rule = Some(rule.clone());
        }
        self
    }
}

impl From<ModelError> for Failure {
    fn from(error: ModelError) -> Self {
        Self { rule: None, error }
    }
}

/// Per-call realization progress.
#[derive(Default)]
struct Walk {
    chain: Vec<Path>,
    closing: Vec<NodeId>,
}

impl Walk {
    /// The cycle closed by requesting `path` again, if it is in progress.
    fn cycle_to(&self, path: &Path) -> Option<ModelError> {
        let pos = self.chain.iter().position(|p| p == path)?;
        let mut cycle = self.chain[pos..].to_vec();
        cycle.push(path.clone());
        Some(ModelError::Cycle { chain: cycle })
    }
}

impl ModelRegistry {
    pub(crate) fn realize_to(&mut self, path: &Path, target: NodeState) -> Result<NodeId, ModelRuleExecutionError> {
        let mut walk = Walk::default();
        self.realize_node(path, target, &mut walk).map_err(|failure| {
            tracing::debug!(path = %path, error = %failure.error, "realization failed");
            ModelRuleExecutionError::new(path.clone(), failure.rule, failure.error)
        })
    }

    fn realize_node(&mut self, path: &Path, target: NodeState, walk: &mut Walk) -> Result<NodeId, Failure> {
        if let Some(cycle) = walk.cycle_to(path) {
            return Err(cycle.into());
        }

        let id = self.locate(path, walk)?;
        self.check_late(id)?;
        if self.nodes.get(id).state >= target || walk.closing.contains(&id) {
            return Ok(id);
        }

        if self.nodes.get(id).state < NodeState::Mutated {
            walk.chain.push(path.clone());
            let settled = self.settle(id, walk);
            walk.chain.pop();
            settled?;
        }

        if target == NodeState::Finalized {
            if self.options.close_children {
                // A child still settling further up the stack is finalized by its own caller.
                let children: Vec<Path> = self
                    .nodes
                    .get(id)
                    .children
                    .iter()
                    .map(|(_, c)| self.nodes.get(*c).path.clone())
                    .filter(|child| !walk.chain.contains(child))
                    .collect();
                walk.closing.push(id);
                let closed = children
                    .iter()
                    .try_for_each(|child| self.realize_node(child, NodeState::Finalized, walk).map(|_| ()));
                walk.closing.pop();
                closed?;
            }
            self.nodes.get_mut(id).advance(NodeState::Finalized);
            tracing::debug!(path = %path, "model element finalized");
        }
        Ok(id)
    }

    /// Fails when a rule targeted the node after its mutation rules were collected.
    fn check_late(&self, id: NodeId) -> Result<(), Failure> {
        let node = self.nodes.get(id);
        match node.late_rules.first() {
            Some(&rule_id) => {
                let rule = &self.rules.get(rule_id).descriptor;
                Err(Failure::in_rule(
                    rule,
                    ModelError::LateRule { rule: rule.clone(), path: node.path.clone(), state: node.state },
                ))
            }
            None => Ok(()),
        }
    }

    /// Finds the node at `path`, materializing it from a creation rule or
    /// from an ancestor's rules when it is not registered yet.
    fn locate(&mut self, path: &Path, walk: &mut Walk) -> Result<NodeId, Failure> {
        if let Some(id) = self.nodes.lookup(path) {
            return Ok(id);
        }

        if let Some(&rule_id) = self.rules.creators_at(path).first() {
            let parent_path = path.parent().ok_or_else(|| ModelError::NoElementAtPath { path: path.clone() })?;
            let parent = self.locate(&parent_path, walk)?;
            let type_token = self
                .rules
                .get(rule_id)
                .subject_type
                .clone()
                .unwrap_or_else(|| TypeToken::named("Object"));
            let id = self.nodes.insert(parent, path.clone(), type_token);
            self.nodes.get_mut(id).creator = Some(rule_id);
            tracing::debug!(path = %path, rule = %self.rules.get(rule_id).descriptor, "materialized model element");
            return Ok(id);
        }

        // The nearest registered ancestor may add the element while its rules run.
        let mut ancestor = path.parent();
        while let Some(candidate) = ancestor {
            if let Some(id) = self.nodes.lookup(&candidate) {
                if self.nodes.get(id).state < NodeState::Mutated {
                    if let Some(cycle) = walk.cycle_to(&candidate) {
                        return Err(cycle.into());
                    }
                    self.realize_node(&candidate, NodeState::Mutated, walk)?;
                    return self.locate(path, walk);
                }
                break;
            }
            ancestor = candidate.parent();
        }

        Err(ModelError::NoElementAtPath { path: path.clone() }.into())
    }

    /// Runs the creation rule and every bound mutation rule of a node.
    fn settle(&mut self, id: NodeId, walk: &mut Walk) -> Result<(), Failure> {
        let path = self.nodes.get(id).path.clone();

        for &rule_id in self.rules.applied_at(&path) {
            let rule = self.rules.get(rule_id);
            check_legality(rule).map_err(|v| Failure::in_rule(&rule.descriptor, v.into()))?;
        }

        let creators = self.rules.creators_at(&path).to_vec();
        let own_creator = self.nodes.get(id).creator;
        if creators.len() > 1 || (creators.len() == 1 && own_creator != Some(creators[0])) {
            let rules = creators.iter().map(|r| self.rules.get(*r).descriptor.clone()).collect();
            return Err(ModelError::DuplicateCreator { path, rules }.into());
        }

        if self.nodes.get(id).state == NodeState::Unknown {
            let creator = own_creator.ok_or_else(|| ModelError::NoElementAtPath { path: path.clone() })?;
            self.execute(creator, id, walk)?;
            self.nodes.get_mut(id).advance(NodeState::Created);
            tracing::debug!(path = %path, "model element created");
        }

        if !self.nodes.get(id).mutations_bound {
            let pending = self.bind_mutations(id)?;
            let node = self.nodes.get_mut(id);
            node.pending_mutations = pending;
            node.mutations_bound = true;
        }

        loop {
            let node = self.nodes.get(id);
            let Some(&rule_id) = node.pending_mutations.get(node.drained) else {
                break;
            };
            self.nodes.get_mut(id).drained += 1;
            self.execute(rule_id, id, walk)?;
        }
        self.check_late(id)?;

        self.nodes.get_mut(id).advance(NodeState::Mutated);
        Ok(())
    }

    /// Collects the mutation rules whose subject binds to `id`, in declaration order.
    fn bind_mutations(&mut self, id: NodeId) -> Result<Vec<RuleId>, Failure> {
        let node = self.nodes.get(id);
        let mut pending: Vec<RuleId> = self.rules.path_mutations(&node.path).to_vec();

        let mut by_type = Vec::new();
        {
            let binder = RuleBinder::new(&self.nodes, self.rules.declared(), &self.options);
            for &rule_id in self.rules.type_mutations() {
                if self.rules.bound_to(rule_id).is_some() {
                    continue;
                }
                let rule = self.rules.get(rule_id);
                let Target::Type { type_token, root } = &rule.subject else {
                    continue;
                };
                if !self.options.subject_search.admits(root, &node.path) || !node.type_token.is_assignable_to(type_token) {
                    continue;
                }
                let bound = binder.bind(&rule.subject, Role::Subject).map_err(|e| Failure::in_rule(&rule.descriptor, e))?;
                if bound == node.path {
                    tracing::trace!(path = %node.path, rule = %rule.descriptor, "bound by-type subject");
                    by_type.push(rule_id);
                }
            }
        }

        for &rule_id in &by_type {
            self.rules.bind(rule_id, id);
        }
        for &rule_id in &pending {
            self.rules.bind(rule_id, id);
        }
        pending.extend(by_type);
        pending.sort_by_key(|r| self.rules.get(*r).declaration_order);
        Ok(pending)
    }

    /// Binds and realizes the inputs of a rule, then runs its action against
    /// the subject node.
    fn execute(&mut self, rule_id: RuleId, subject: NodeId, walk: &mut Walk) -> Result<(), Failure> {
        let rule = self.rules.get(rule_id).clone();
        let descriptor = &rule.descriptor;
        check_legality(&rule).map_err(|v| Failure::in_rule(descriptor, v.into()))?;

        let mut input_ids = Vec::with_capacity(rule.inputs.len());
        for input in &rule.inputs {
            let input_path = RuleBinder::new(&self.nodes, self.rules.declared(), &self.options)
                .bind(input, Role::Input)
                .map_err(|e| Failure::in_rule(descriptor, e))?;
            let input_id = self
                .realize_node(&input_path, NodeState::Finalized, walk)
                .map_err(|f| f.or_rule(descriptor))?;
            input_ids.push(input_id);
        }

        let subject_path = self.nodes.get(subject).path.clone();
        let mut value = self.nodes.get_mut(subject).value.take();
        let outcome = {
            let inputs = input_ids
                .iter()
                .map(|&i| {
                    let node = self.nodes.get(i);
                    (&node.path, node.value.as_ref())
                })
                .collect();
            let mut ctx = RuleContext::new(&subject_path, &mut value, inputs);
            let result = (rule.action)(&mut ctx);
            result.map(|()| ctx.into_deferred())
        };
        self.nodes.get_mut(subject).value = value;

        let deferred = outcome.map_err(|source| {
            Failure::in_rule(descriptor, ModelError::ExecutionFailure { rule: descriptor.clone(), source })
        })?;
        tracing::debug!(path = %subject_path, rule = %descriptor, "executed model rule");

        for request in deferred {
            match request {
                Deferred::AddChild { name, registration } => {
                    self.register(&subject_path.child(&name), registration)
                        .map_err(|e| Failure::in_rule(descriptor, e))?;
                }
                Deferred::Apply { scope, source } => self.apply_within(scope, rule.scope.clone(), source),
            }
        }
        Ok(())
    }
}
