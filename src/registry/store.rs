//! Rule storage and the lookup indices used during realization.
use crate::addressing::{Path, TypeToken};
use crate::graph::NodeId;
use crate::rules::{RuleId, RuleKind, ScopedRule, Target};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct RuleStore {
    rules: Vec<ScopedRule>,
    /// Node each rule's subject was bound to, once known.
    bound: Vec<Option<NodeId>>,
    creators: HashMap<Path, Vec<RuleId>>,
    path_mutations: HashMap<Path, Vec<RuleId>>,
    type_mutations: Vec<RuleId>,
    /// Rules whose subject cannot be bound at all, e.g. creation by type.
    stray: Vec<RuleId>,
    by_scope: HashMap<Path, Vec<RuleId>>,
    /// Declared subject types of creation rules, searched by type before materialization.
    declared: BTreeMap<Path, TypeToken>,
    next_order: u64,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_order_mut(&mut self) -> &mut u64 {
        &mut self.next_order
    }

    pub fn add(&mut self, rule: ScopedRule) -> RuleId {
        let id = RuleId::new(self.rules.len());
        self.by_scope.entry(rule.scope.clone()).or_default().push(id);
        match (&rule.kind, &rule.subject) {
            (RuleKind::Create, Target::Path(path)) => {
                self.creators.entry(path.clone()).or_default().push(id);
                if let Some(declared) = &rule.subject_type {
                    self.declared.entry(path.clone()).or_insert_with(|| declared.clone());
                }
            }
            (RuleKind::Create, Target::Type { .. }) => self.stray.push(id),
            (RuleKind::Mutate, Target::Path(path)) => self.path_mutations.entry(path.clone()).or_default().push(id),
            (RuleKind::Mutate, Target::Type { .. }) => self.type_mutations.push(id),
        }
        self.rules.push(rule);
        self.bound.push(None);
        id
    }

    pub fn get(&self, id: RuleId) -> &ScopedRule {
        &self.rules[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &ScopedRule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId::new(i), r))
    }

    pub fn creators_at(&self, path: &Path) -> &[RuleId] {
        self.creators.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn path_mutations(&self, path: &Path) -> &[RuleId] {
        self.path_mutations.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn type_mutations(&self) -> &[RuleId] {
        &self.type_mutations
    }

    pub fn stray(&self) -> &[RuleId] {
        &self.stray
    }

    /// Rules belonging to rule sources applied at `scope`.
    pub fn applied_at(&self, scope: &Path) -> &[RuleId] {
        self.by_scope.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn declared(&self) -> &BTreeMap<Path, TypeToken> {
        &self.declared
    }

    pub fn bound_to(&self, id: RuleId) -> Option<NodeId> {
        self.bound[id.index()]
    }

    pub fn bind(&mut self, id: RuleId, node: NodeId) {
        self.bound[id.index()] = Some(node);
    }
}
