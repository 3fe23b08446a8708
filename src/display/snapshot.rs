//! Serializable diagnostics reports of a registry's current state.
use crate::addressing::Path;
use crate::graph::NodeState;
use crate::registry::ModelRegistry;
use crate::rules::RuleKind;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub path: Path,
    pub type_token: String,
    pub state: NodeState,
    pub value_type: Option<&'static str>,
    pub executed_mutations: usize,
    pub children: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub rule: String,
    pub kind: &'static str,
    pub scope: Path,
    pub subject: String,
    pub declaration_order: u64,
    pub bound_to: Option<Path>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    pub nodes: Vec<NodeReport>,
    pub rules: Vec<RuleReport>,
}

impl RegistrySnapshot {
    pub fn capture(registry: &ModelRegistry) -> Self {
        let nodes = registry
            .nodes()
            .iter()
            .map(|(_, n)| NodeReport {
                path: n.path.clone(),
                type_token: n.type_token.to_string(),
                state: n.state,
                value_type: n.value.as_ref().map(|v| v.type_name()),
                executed_mutations: n.drained,
                children: n.children.len(),
            })
            .collect();

        let rules = registry
            .rules()
            .iter()
            .map(|(id, r)| RuleReport {
                rule: r.descriptor.to_string(),
                kind: match r.kind {
                    RuleKind::Create => "create",
                    RuleKind::Mutate => "mutate",
                },
                scope: r.scope.clone(),
                subject: r.subject.to_string(),
                declaration_order: r.declaration_order,
                bound_to: registry.rules().bound_to(id).map(|n| registry.nodes().get(n).path.clone()),
            })
            .collect();

        Self { nodes, rules }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
