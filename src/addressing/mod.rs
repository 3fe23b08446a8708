//! Immutable keys used everywhere else: hierarchical paths and type tokens.
pub mod path;
pub mod type_token;

pub use path::{InvalidPath, Path};
pub use type_token::TypeToken;
