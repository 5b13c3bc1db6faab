use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::value::Value;

/// One call into the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub script: String,
    /// The only variables the script can see besides the built-in library.
    pub bindings: BTreeMap<String, Value>,
    /// Overrides the sandbox's default budget for this call.
    pub timeout: Option<Duration>,
}

impl EvaluationRequest {
    pub fn new(script: impl Into<String>) -> Self {
        EvaluationRequest {
            script: script.into(),
            bindings: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn with_bindings(mut self, bindings: BTreeMap<String, Value>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Why an evaluation produced no value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationFailure {
    #[error("SyntaxError: {message} ({line}:{column})")]
    CompileError {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("{message}")]
    RuntimeError { message: String },
    #[error("Evaluation exceeded its budget of {budget_ms} ms")]
    Timeout { budget_ms: u64 },
    #[error("{resource} limit of {limit} exceeded")]
    ResourceExceeded { resource: &'static str, limit: usize },
}

impl EvaluationFailure {
    /// Stable tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EvaluationFailure::CompileError { .. } => "compile_error",
            EvaluationFailure::RuntimeError { .. } => "runtime_error",
            EvaluationFailure::Timeout { .. } => "timeout",
            EvaluationFailure::ResourceExceeded { .. } => "resource_exceeded",
        }
    }

    /// Timeouts and resource ceilings may indicate a hostile script.
    pub fn is_abuse_signal(&self) -> bool {
        matches!(
            self,
            EvaluationFailure::Timeout { .. } | EvaluationFailure::ResourceExceeded { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Success(Value),
    Failure(EvaluationFailure),
}

impl EvaluationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationResult::Success(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            EvaluationResult::Success(value) => Some(value),
            EvaluationResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EvaluationFailure> {
        match self {
            EvaluationResult::Success(_) => None,
            EvaluationResult::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<Value, EvaluationFailure> {
        match self {
            EvaluationResult::Success(value) => Ok(value),
            EvaluationResult::Failure(failure) => Err(failure),
        }
    }
}

impl From<Result<Value, EvaluationFailure>> for EvaluationResult {
    fn from(result: Result<Value, EvaluationFailure>) -> Self {
        match result {
            Ok(value) => EvaluationResult::Success(value),
            Err(failure) => EvaluationResult::Failure(failure),
        }
    }
}

/// What is known about a finished evaluation, passed to result hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub elapsed: Duration,
    pub budget: Duration,
    pub script_bytes: usize,
}

/// An audit line about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub evaluation_id: Uuid,
    pub kind: &'static str,
    pub message: String,
}
