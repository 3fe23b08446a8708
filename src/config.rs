//! Registry options.
//!
//! Options are plain serde data so a host can keep them next to the rest of
//! its configuration and load them with [`RegistryOptions::from_json`].

use serde::{Deserialize, Serialize};

/// How far below its root a by-type search looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDepth {
    /// The root itself and every node below it.
    #[default]
    Subtree,
    /// Only the direct children of the root.
    Children,
}

impl SearchDepth {
    pub(crate) fn admits(self, root: &crate::Path, candidate: &crate::Path) -> bool {
        match self {
            SearchDepth::Subtree => candidate.is_self_or_descendant_of(root),
            SearchDepth::Children => candidate.parent().as_ref() == Some(root),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    /// Search depth for by-type subjects, below the scope a rule source was applied at.
    pub subject_search: SearchDepth,
    /// Search depth for by-type inputs, below the scope enclosing the apply call.
    pub input_search: SearchDepth,
    /// Realize children before a node is reported `Finalized`.
    pub close_children: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            subject_search: SearchDepth::Subtree,
            input_search: SearchDepth::Subtree,
            close_children: true,
        }
    }
}

impl RegistryOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Path;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts = RegistryOptions::from_json(r#"{ "subject_search": "children" }"#).unwrap();
        assert_eq!(opts.subject_search, SearchDepth::Children);
        assert_eq!(opts.input_search, SearchDepth::Subtree);
        assert!(opts.close_children);
    }

    #[test]
    fn test_unknown_depth_is_rejected() {
        assert!(RegistryOptions::from_json(r#"{ "input_search": "everywhere" }"#).is_err());
    }

    #[test]
    fn test_depth_admission() {
        let root = Path::parse("values").unwrap();
        let child = root.child("a");
        let grandchild = child.child("b");
        assert!(SearchDepth::Subtree.admits(&root, &grandchild));
        assert!(SearchDepth::Subtree.admits(&root, &root));
        assert!(SearchDepth::Children.admits(&root, &child));
        assert!(!SearchDepth::Children.admits(&root, &grandchild));
        assert!(!SearchDepth::Children.admits(&root, &root));
    }
}
