//! Static validation of the registered rules.
//!
//! Realization reports the first problem it runs into; the validator binds
//! every rule without executing actions and collects all of them, like a
//! linter run before "compilation".

mod error;
mod validator;

pub use self::error::{ValidationError, ValidationErrorType};
pub use self::validator::Validator;
