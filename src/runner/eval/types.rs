//! Core types for the evaluation engine.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;

/// Completion record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionType {
    /// Normal completion - execution continues.
    Normal,
    /// Return completion - the script returns.
    Return,
    /// Break completion - break from loop/switch.
    Break,
    /// Continue completion - continue loop iteration.
    Continue,
}

/// Completion record.
///
/// Every statement evaluation returns one. Thrown values travel as
/// `Err(JErrorType::Thrown(..))` instead, so `?` unwinds them.
#[derive(Debug, Clone)]
pub struct Completion {
    pub completion_type: CompletionType,
    pub value: Option<JsValue>,
}

impl Completion {
    pub fn normal() -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: None,
        }
    }

    pub fn return_value(value: JsValue) -> Self {
        Completion {
            completion_type: CompletionType::Return,
            value: Some(value),
        }
    }

    pub fn break_completion() -> Self {
        Completion {
            completion_type: CompletionType::Break,
            value: None,
        }
    }

    pub fn continue_completion() -> Self {
        Completion {
            completion_type: CompletionType::Continue,
            value: None,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.completion_type == CompletionType::Normal
    }

    pub fn is_abrupt(&self) -> bool {
        !self.is_normal()
    }

    /// Get the value, or undefined if none.
    pub fn get_value(&self) -> JsValue {
        self.value.clone().unwrap_or(JsValue::Undefined)
    }
}

/// Where an assignment lands.
#[derive(Debug, Clone)]
pub enum ReferenceBase {
    /// A property on a value.
    Object(JsValue),
    /// A binding in the scope chain.
    Environment,
}

/// A resolved assignment target.
#[derive(Debug, Clone)]
pub struct Reference {
    pub base: ReferenceBase,
    pub referenced_name: String,
}

impl Reference {
    pub fn property(base: JsValue, name: impl Into<String>) -> Self {
        Reference {
            base: ReferenceBase::Object(base),
            referenced_name: name.into(),
        }
    }

    pub fn environment(name: impl Into<String>) -> Self {
        Reference {
            base: ReferenceBase::Environment,
            referenced_name: name.into(),
        }
    }
}

/// Result type for evaluation operations.
pub type EvalResult = Result<Completion, JErrorType>;

/// Result type for value-returning operations.
pub type ValueResult = Result<JsValue, JErrorType>;

/// Result type for reference-returning operations.
pub type ReferenceResult = Result<Reference, JErrorType>;
