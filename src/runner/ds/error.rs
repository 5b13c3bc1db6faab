use thiserror::Error;

use crate::runner::ds::value::JsValue;

/// Abrupt outcomes inside the interpreter.
///
/// The first four mirror the JavaScript error types and are catchable by
/// `try`/`catch`, as is `Thrown`. Resource ceilings and interruption unwind
/// straight to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JErrorType {
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("RangeError: {0}")]
    RangeError(String),
    #[error("SyntaxError: {0}")]
    SyntaxError(String),
    #[error("Uncaught {0}")]
    Thrown(JsValue),
    #[error("{resource} limit of {limit} exceeded")]
    ResourceExceeded { resource: &'static str, limit: usize },
    #[error("Evaluation interrupted")]
    Interrupted,
}

impl JErrorType {
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            JErrorType::ResourceExceeded { .. } | JErrorType::Interrupted
        )
    }

    /// Constructor name and message for the catchable built-in error kinds.
    pub fn name_and_message(&self) -> Option<(&'static str, &str)> {
        match self {
            JErrorType::ReferenceError(m) => Some(("ReferenceError", m)),
            JErrorType::TypeError(m) => Some(("TypeError", m)),
            JErrorType::RangeError(m) => Some(("RangeError", m)),
            JErrorType::SyntaxError(m) => Some(("SyntaxError", m)),
            _ => None,
        }
    }
}
