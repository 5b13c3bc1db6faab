mod api;
pub mod ast;
mod static_semantics;
#[allow(non_fmt_panics)]
#[cfg(test)]
mod unit_tests;

use thiserror::Error;

pub use api::{parse_script, parse_to_ast, Rule, ScriptParser};

/// A script that failed to compile, positioned at the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
