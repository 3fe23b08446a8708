//! storage.rs
//! Dense node arena keyed by `Path`, parent-owns-child.

use super::node::{Node, NodeState};
use crate::addressing::{Path, TypeToken};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Owns every node of the model graph. Node 0 is always the root.
#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Node>,
    by_path: HashMap<Path, NodeId>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        // The root has no value and no creator; it starts out created.
        let mut root = Node::new(Path::root(), TypeToken::named("Root"), None);
        root.advance(NodeState::Created);
        let mut by_path = HashMap::new();
        by_path.insert(Path::root(), NodeId(0));
        Self { nodes: vec![root], by_path }
    }

    pub fn root(&self) -> NodeId { NodeId(0) }

    pub fn lookup(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    pub fn get(&self, id: NodeId) -> &Node { &self.nodes[id.index()] }
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node { &mut self.nodes[id.index()] }

    /// Links a new node under `parent`. The caller guarantees `path` is unused
    /// and that `parent` is the node at `path.parent()`.
    pub(crate) fn insert(&mut self, parent: NodeId, path: Path, type_token: TypeToken) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let name = path.name().map(str::to_owned).unwrap_or_default();
        self.nodes.push(Node::new(path.clone(), type_token, Some(parent)));
        self.nodes[parent.index()].add_child(&name, id);
        self.by_path.insert(path, id);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId::new(i), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_insert_links_parent_and_child() {
        let mut arena = NodeArena::new();
        let values = arena.insert(arena.root(), p("values"), TypeToken::named("Values"));
        let first = arena.insert(values, p("values.first"), TypeToken::named("Mutable"));

        assert_eq!(arena.lookup(&p("values.first")), Some(first));
        let children: Vec<(&str, NodeId)> = arena.get(values).children.iter().map(|(n, id)| (n.as_ref(), *id)).collect();
        assert_eq!(children, vec![("first", first)]);
        assert_eq!(arena.get(first).parent, Some(values));
        assert_eq!(arena.get(values).parent, Some(arena.root()));
    }

    #[test]
    fn test_root_starts_created() {
        let arena = NodeArena::new();
        let root = arena.get(arena.root());
        assert!(root.path.is_root());
        assert_eq!(root.state, NodeState::Created);
        assert_eq!(arena.iter().count(), 1);
    }
}
