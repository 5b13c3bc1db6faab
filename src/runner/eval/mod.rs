//! Tree-walking evaluation of the script AST.

pub mod expression;
pub mod statement;
pub mod types;

pub use types::{Completion, CompletionType, Reference, ReferenceBase};
