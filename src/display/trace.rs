use crate::graph::{NodeArena, NodeId};
use crate::registry::ModelRegistry;
use std::fmt::Write;

/// Renders the model tree with each element's type, state and outstanding
/// mutation rules.
pub fn format_tree(registry: &ModelRegistry) -> String {
    let mut tracer = Tracer { nodes: registry.nodes(), registry, output: String::new() };
    let _ = writeln!(tracer.output, "MODEL TREE:");
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_node(registry.nodes().root(), "", "");
    tracer.output
}

struct Tracer<'a> {
    nodes: &'a NodeArena,
    registry: &'a ModelRegistry,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, id: NodeId, prefix: &str, stem: &str) {
        let nodes = self.nodes;
        let node = nodes.get(id);
        let label = match node.path.name() {
            Some(name) => name.to_string(),
            None => node.path.to_string(),
        };
        let value = match &node.value {
            Some(v) => format!(" = {}", v.type_name()),
            None => String::new(),
        };
        let pending = if node.mutations_bound {
            node.remaining_mutations().len()
        } else {
            self.registry.rules().path_mutations(&node.path).len()
        };
        let pending_str = if pending > 0 { format!(" ({} pending)", pending) } else { String::new() };

        let _ = writeln!(
            self.output,
            "{}{} : {} [{:?}]{}{}",
            prefix, label, node.type_token, node.state, value, pending_str
        );

        let children = &node.children;
        for (i, (_, child)) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;
            let connector = if is_last { "`-- " } else { "|-- " };
            let next_stem = if is_last { "    " } else { "|   " };
            self.trace_node(*child, &format!("{}{}", stem, connector), &format!("{}{}", stem, next_stem));
        }
    }
}
