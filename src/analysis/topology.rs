use crate::addressing::Path;
use crate::rules::RuleDescriptor;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The rule dependency graph: an edge `subject -> input` for every input a
/// rule reads. Independent of the ownership tree, it may cross branches.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<Path, RuleDescriptor>,
    index: HashMap<Path, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, path: &Path) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.index.insert(path.clone(), idx);
        idx
    }

    pub fn add_dependency(&mut self, subject: &Path, input: &Path, rule: RuleDescriptor) {
        let s = self.node(subject);
        let i = self.node(input);
        self.graph.add_edge(s, i, rule);
    }

    /// Every strongly connected component that forms a cycle, including
    /// rules that read their own subject. Paths within a cycle are sorted.
    pub fn cycles(&self) -> Vec<Vec<Path>> {
        let mut cycles: Vec<Vec<Path>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut paths: Vec<Path> = scc.into_iter().map(|n| self.graph[n].clone()).collect();
                paths.sort();
                paths
            })
            .collect();
        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn rule(name: &str) -> RuleDescriptor {
        RuleDescriptor::new("Rules", name)
    }

    #[test]
    fn test_diamond_has_no_cycle() {
        // Shape: d reads b and c, both read a.
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&p("b"), &p("a"), rule("b"));
        graph.add_dependency(&p("c"), &p("a"), rule("c"));
        graph.add_dependency(&p("d"), &p("b"), rule("d1"));
        graph.add_dependency(&p("d"), &p("c"), rule("d2"));

        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_cycles_across_branches_and_self_loops() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(&p("values.a"), &p("other.b"), rule("a"));
        graph.add_dependency(&p("other.b"), &p("values.a"), rule("b"));
        graph.add_dependency(&p("self"), &p("self"), rule("loop"));
        graph.add_dependency(&p("free"), &p("values.a"), rule("free"));

        assert_eq!(graph.cycles(), vec![vec![p("other.b"), p("values.a")], vec![p("self")]]);
    }
}
