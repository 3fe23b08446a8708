//! Declared-type descriptors used for by-type binding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An opaque, comparable descriptor of a model element's declared type.
///
/// Equality and hashing consider only the name and the type parameters.
/// Declared supertypes widen [`TypeToken::is_assignable_to`] without
/// affecting identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeToken {
    name: Arc<str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    params: Vec<TypeToken>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    supertypes: Vec<TypeToken>,
}

impl TypeToken {
    pub fn named(name: &str) -> Self {
        Self { name: Arc::from(name), params: Vec::new(), supertypes: Vec::new() }
    }

    /// Derives a token from a Rust type. Generic arguments are part of the name.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    pub fn with_param(mut self, param: TypeToken) -> Self {
        self.params.push(param);
        self
    }

    pub fn extends(mut self, supertype: TypeToken) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[TypeToken] {
        &self.params
    }

    /// True when a value declared as `self` may be bound where `target` is requested.
    pub fn is_assignable_to(&self, target: &TypeToken) -> bool {
        self == target || self.supertypes.iter().any(|s| s.is_assignable_to(target))
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl Eq for TypeToken {}

impl Hash for TypeToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.params.hash(state);
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.params.is_empty() {
            f.write_str("<")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", p)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}
