//! Defines the `Node`, one addressable element of the model graph, together
//! with its lifecycle state and type-erased value.

use super::storage::NodeId;
use crate::addressing::{Path, TypeToken};
use crate::rules::RuleId;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a node. A node only ever moves forward through these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Registered, but no creation rule has run yet.
    Unknown,
    /// The initial value exists.
    Created,
    /// All mutation rules bound to the node have run.
    Mutated,
    /// The node and its children are fully realized.
    Finalized,
}

/// A type-erased model value.
///
/// Remembers the concrete Rust type name so mismatches can be reported.
pub struct ModelValue {
    inner: Box<dyn Any>,
    type_name: &'static str,
}

impl ModelValue {
    pub fn new<T: Any>(value: T) -> Self {
        Self { inner: Box::new(value), type_name: std::any::type_name::<T>() }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.inner.downcast_mut()
    }
}

impl fmt::Debug for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelValue<{}>", self.type_name)
    }
}

/// One element of the model graph.
///
/// A node stores bindings and reports its state; it never executes a rule
/// itself. Children are owned through the arena, the parent link is a
/// plain back-reference.
#[derive(Debug)]
pub struct Node {
    pub path: Path,
    pub type_token: TypeToken,
    pub state: NodeState,
    pub value: Option<ModelValue>,
    /// The creation rule, when the value is produced by a rule.
    pub creator: Option<RuleId>,
    /// Mutation rules bound to this node, sorted by declaration order on first realization.
    pub pending_mutations: Vec<RuleId>,
    /// Set once `pending_mutations` has been collected and sorted.
    pub mutations_bound: bool,
    /// How many entries of `pending_mutations` have run.
    pub drained: usize,
    /// Rules that targeted the node after `pending_mutations` was collected.
    pub late_rules: Vec<RuleId>,
    pub parent: Option<NodeId>,
    pub children: Vec<(Arc<str>, NodeId)>,
}

impl Node {
    pub(crate) fn new(path: Path, type_token: TypeToken, parent: Option<NodeId>) -> Self {
        Self {
            path,
            type_token,
            state: NodeState::Unknown,
            value: None,
            creator: None,
            pending_mutations: Vec::new(),
            mutations_bound: false,
            drained: 0,
            late_rules: Vec::new(),
            parent,
            children: Vec::new(),
        }
    }

    pub(crate) fn add_child(&mut self, name: &str, id: NodeId) {
        self.children.push((Arc::from(name), id));
    }

    /// Moves the node forward. Requests to move backwards are ignored.
    pub(crate) fn advance(&mut self, state: NodeState) {
        if state > self.state {
            self.state = state;
        }
    }

    pub fn remaining_mutations(&self) -> &[RuleId] {
        &self.pending_mutations[self.drained.min(self.pending_mutations.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_never_regresses() {
        let mut node = Node::new(Path::parse("a").unwrap(), TypeToken::named("A"), None);
        node.advance(NodeState::Mutated);
        node.advance(NodeState::Created);
        assert_eq!(node.state, NodeState::Mutated);
    }

    #[test]
    fn test_model_value_downcasts() {
        let mut value = ModelValue::new(String::from("foo"));
        assert!(value.is::<String>());
        assert_eq!(value.downcast_ref::<i32>(), None);
        value.downcast_mut::<String>().unwrap().push_str("bar");
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("foobar"));
        assert_eq!(value.type_name(), "alloc::string::String");
    }
}
