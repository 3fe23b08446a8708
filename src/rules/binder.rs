//! Resolves rule references to concrete paths.
use super::scope::Target;
use crate::addressing::{Path, TypeToken};
use crate::config::{RegistryOptions, SearchDepth};
use crate::error::ModelError;
use crate::graph::NodeArena;
use std::collections::BTreeMap;

/// Which side of a rule a reference belongs to. Subjects and inputs may use
/// different search depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Subject,
    Input,
}

/// Binds references against the current graph.
///
/// Besides registered nodes, by-type searches see the subjects of creation
/// rules that have not been materialized yet.
pub struct RuleBinder<'a> {
    nodes: &'a NodeArena,
    declared: &'a BTreeMap<Path, TypeToken>,
    options: &'a RegistryOptions,
}

impl<'a> RuleBinder<'a> {
    pub fn new(nodes: &'a NodeArena, declared: &'a BTreeMap<Path, TypeToken>, options: &'a RegistryOptions) -> Self {
        Self { nodes, declared, options }
    }

    pub fn bind(&self, target: &Target, role: Role) -> Result<Path, ModelError> {
        match target {
            Target::Path(path) => Ok(path.clone()),
            Target::Type { type_token, root } => {
                let depth = match role {
                    Role::Subject => self.options.subject_search,
                    Role::Input => self.options.input_search,
                };
                let mut candidates = self.candidates(type_token, root, depth);
                tracing::trace!(%type_token, %root, matches = candidates.len(), "by-type binding");
                match candidates.len() {
                    0 => Err(ModelError::NoElementOfType { type_token: type_token.clone(), root: root.clone() }),
                    1 => Ok(candidates.remove(0)),
                    _ => Err(ModelError::Ambiguous { type_token: type_token.clone(), root: root.clone(), candidates }),
                }
            }
        }
    }

    /// All paths below `root` whose declared type is assignable to `type_token`, sorted.
    pub fn candidates(&self, type_token: &TypeToken, root: &Path, depth: SearchDepth) -> Vec<Path> {
        let mut found: Vec<Path> = self
            .nodes
            .iter()
            .filter(|(_, n)| depth.admits(root, &n.path) && n.type_token.is_assignable_to(type_token))
            .map(|(_, n)| n.path.clone())
            .collect();

        for (path, declared) in self.declared {
            if self.nodes.lookup(path).is_none() && depth.admits(root, path) && declared.is_assignable_to(type_token) {
                found.push(path.clone());
            }
        }
        found.sort();
        found
    }
}
