//! Hierarchical, immutable model paths.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A dotted address of a model element, e.g. `values.first`.
///
/// The empty path is the registry root. Two paths are equal iff their
/// segment sequences are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Path {
    segments: SmallVec<[Arc<str>; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid model path '{path}': {reason}")]
pub struct InvalidPath {
    pub path: String,
    pub reason: &'static str,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path. The empty string is the root path.
    pub fn parse(path: &str) -> Result<Self, InvalidPath> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = SmallVec::new();
        for segment in path.split('.') {
            validate_segment(segment).map_err(|reason| InvalidPath { path: path.to_string(), reason })?;
            segments.push(Arc::from(segment));
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_ref())
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.as_ref())
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Arc::from(name));
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Strict descendant check: a path is not a descendant of itself.
    pub fn is_descendant_of(&self, other: &Path) -> bool {
        self.depth() > other.depth() && self.segments.starts_with(&other.segments)
    }

    pub fn is_self_or_descendant_of(&self, other: &Path) -> bool {
        self == other || self.is_descendant_of(other)
    }

    /// Resolves `declared` relative to `scope`: `scope.child(declared...)`.
    pub fn resolve_relative(scope: &Path, declared: &Path) -> Path {
        let mut segments = scope.segments.clone();
        segments.extend(declared.segments.iter().cloned());
        Self { segments }
    }
}

fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty segment");
    }
    if segment.chars().any(char::is_whitespace) {
        return Err("segments cannot contain whitespace");
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = InvalidPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.segments().collect::<Vec<_>>().join(".")
    }
}

impl TryFrom<String> for Path {
    type Error = InvalidPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
