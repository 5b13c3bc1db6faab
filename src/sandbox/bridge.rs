//! Where the rest of the system finds the active evaluator.
//!
//! Components receive an [`EvaluatorHandle`] when they are built. Registering
//! a new evaluator swaps the slot for every clone of the handle; evaluations
//! already running keep the instance they started with.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ConfigurationError, Error};
use crate::sandbox::{EvaluationRequest, EvaluationResult, Evaluator};

/// Shared slot holding the current evaluator.
#[derive(Clone, Default)]
pub struct EvaluatorHandle {
    slot: Arc<RwLock<Option<Arc<dyn Evaluator>>>>,
}

impl fmt::Debug for EvaluatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorHandle")
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl EvaluatorHandle {
    pub fn new() -> Self {
        EvaluatorHandle::default()
    }

    /// Install `evaluator`, returning the one it replaces.
    pub fn register(&self, evaluator: Arc<dyn Evaluator>) -> Option<Arc<dyn Evaluator>> {
        self.slot.write().replace(evaluator)
    }

    pub fn is_registered(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn current(&self) -> Result<Arc<dyn Evaluator>, ConfigurationError> {
        self.slot.read().clone().ok_or(ConfigurationError::NoEvaluator)
    }

    /// Evaluate with whatever evaluator is registered now. The lock is
    /// released before the evaluation starts.
    pub fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error> {
        let evaluator = self.current()?;
        evaluator.evaluate(request)
    }
}

lazy_static! {
    static ref PROCESS_EVALUATOR: EvaluatorHandle = EvaluatorHandle::new();
}

/// Register the process-wide evaluator, for callers that cannot be handed an
/// [`EvaluatorHandle`].
pub fn register_evaluator(evaluator: Arc<dyn Evaluator>) -> Option<Arc<dyn Evaluator>> {
    PROCESS_EVALUATOR.register(evaluator)
}

/// The process-wide handle.
pub fn process_evaluator() -> EvaluatorHandle {
    PROCESS_EVALUATOR.clone()
}
