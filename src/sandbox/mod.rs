//! Sandboxed evaluation of untrusted form logic.
//!
//! Every evaluation gets a dedicated worker thread that owns a fresh
//! interpreter heap and scope chain. The worker checks a wall-clock deadline at
//! every statement, loop iteration and expression step; the caller stops
//! waiting at the deadline plus a short grace period, raises the worker's
//! cancellation flag and reports `Timeout`. Nothing is shared between
//! evaluations except the read-only built-in library, so a killed evaluation
//! cannot affect the next one.
//!
//! ```
//! use std::sync::Arc;
//! use formlogic::hooks::HookRegistry;
//! use formlogic::sandbox::{EvaluationRequest, Sandbox, SandboxConfig};
//! use formlogic::value::Value;
//!
//! let sandbox = Sandbox::configure(
//!     SandboxConfig::with_timeout_ms(100),
//!     Arc::new(HookRegistry::new()),
//! )
//! .unwrap();
//! let request = EvaluationRequest::new("return a + b;")
//!     .with_binding("a", 2)
//!     .with_binding("b", 3);
//! let result = sandbox.evaluate(request).unwrap();
//! assert_eq!(result.value(), Some(&Value::Number(5.0)));
//! ```

pub mod bridge;
pub mod config;
pub mod request;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::hooks::{AfterEvaluate, BeforeEvaluate, ConfigureSandbox, EmitLog, EvaluationTimedOut, HookRegistry};
use crate::runner::api::{run_script, Interrupt, RunError};
use crate::runner::plugin::BuiltInRegistry;
use crate::value::Value;

pub use bridge::{process_evaluator, register_evaluator, EvaluatorHandle};
pub use config::{Limits, SandboxConfig};
pub use request::{EvaluationFailure, EvaluationRecord, EvaluationRequest, EvaluationResult, LogLine};

/// Deep expression nesting recurses; the default thread stack is not enough
/// for `maxNestingDepth` levels.
const WORKER_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Anything that can run an evaluation request.
///
/// The outer `Err` carries host-side failures (a hook handler failed). Script
/// failures are an `Ok(EvaluationResult::Failure(..))`.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error>;
}

/// The default [`Evaluator`]: the built-in interpreter on per-call worker
/// threads.
#[derive(Clone)]
pub struct Sandbox {
    config: SandboxConfig,
    default_timeout: Duration,
    hooks: Arc<HookRegistry>,
    builtins: Arc<BuiltInRegistry>,
    active: Arc<AtomicUsize>,
}

/// Per-call bookkeeping shared by the sync and async paths.
struct Evaluation {
    id: Uuid,
    budget: Duration,
    started: Instant,
    script_bytes: usize,
}

impl Evaluation {
    fn budget_ms(&self) -> u64 {
        u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX)
    }

    fn record(&self) -> EvaluationRecord {
        EvaluationRecord {
            id: self.id,
            elapsed: self.started.elapsed(),
            budget: self.budget,
            script_bytes: self.script_bytes,
        }
    }
}

/// Releases a concurrency slot when the worker exits.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn acquire(active: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n < max {
                    Some(n + 1)
                } else {
                    None
                }
            })
            .ok()
            .map(|_| ActiveGuard(Arc::clone(active)))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Tells the worker to stop once the caller no longer waits for it.
struct CancelOnDrop(Interrupt);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl Sandbox {
    /// Pass `config` through the `sandbox.configure` hook, validate it and
    /// build a sandbox with the core built-in library.
    pub fn configure(config: SandboxConfig, hooks: Arc<HookRegistry>) -> Result<Self, Error> {
        let config = hooks.alter::<ConfigureSandbox>(config, &())?;
        let default_timeout = config.validate()?;
        debug!(
            timeout_ms = default_timeout.as_millis() as u64,
            max_concurrent = config.limits.max_concurrent,
            "sandbox configured"
        );
        Ok(Sandbox {
            config,
            default_timeout,
            hooks,
            builtins: Arc::new(BuiltInRegistry::with_core()),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Replace the built-in library visible to scripts.
    pub fn with_builtins(mut self, builtins: Arc<BuiltInRegistry>) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Workers currently running, including ones still winding down after a
    /// timeout.
    pub fn active_evaluations(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Run `request`, blocking the calling thread until it finishes or its
    /// budget runs out.
    pub fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error> {
        let request = self.hooks.alter::<BeforeEvaluate>(request, &())?;
        let evaluation = self.begin(&request);
        let (tx, rx) = mpsc::channel();
        let outcome = match self.launch(&evaluation, request, move |result| {
            let _ = tx.send(result);
        }) {
            Ok(interrupt) => {
                let _cancel = CancelOnDrop(interrupt);
                match rx.recv_timeout(self.wait_limit(&evaluation)) {
                    Ok(result) => self.to_outcome(&evaluation, result),
                    Err(mpsc::RecvTimeoutError::Timeout) => Err(EvaluationFailure::Timeout {
                        budget_ms: evaluation.budget_ms(),
                    }),
                    Err(mpsc::RecvTimeoutError::Disconnected) => Err(worker_lost()),
                }
            }
            Err(failure) => Err(failure),
        };
        self.finish(&evaluation, outcome)
    }

    /// Like [`Sandbox::evaluate`], but suspends only the calling task.
    pub async fn evaluate_async(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error> {
        let request = self.hooks.alter::<BeforeEvaluate>(request, &())?;
        let evaluation = self.begin(&request);
        let (tx, rx) = oneshot::channel();
        let outcome = match self.launch(&evaluation, request, move |result| {
            let _ = tx.send(result);
        }) {
            Ok(interrupt) => {
                let _cancel = CancelOnDrop(interrupt);
                match tokio::time::timeout(self.wait_limit(&evaluation), rx).await {
                    Ok(Ok(result)) => self.to_outcome(&evaluation, result),
                    Ok(Err(_)) => Err(worker_lost()),
                    Err(_) => Err(EvaluationFailure::Timeout {
                        budget_ms: evaluation.budget_ms(),
                    }),
                }
            }
            Err(failure) => Err(failure),
        };
        self.finish(&evaluation, outcome)
    }

    fn begin(&self, request: &EvaluationRequest) -> Evaluation {
        Evaluation {
            id: Uuid::new_v4(),
            budget: request.timeout.unwrap_or(self.default_timeout),
            started: Instant::now(),
            script_bytes: request.script.len(),
        }
    }

    fn wait_limit(&self, evaluation: &Evaluation) -> Duration {
        evaluation
            .budget
            .saturating_add(self.config.termination_grace())
    }

    /// Start the worker thread. `deliver` is called on the worker with the
    /// interpreter's result.
    fn launch<F>(
        &self,
        evaluation: &Evaluation,
        request: EvaluationRequest,
        deliver: F,
    ) -> Result<Interrupt, EvaluationFailure>
    where
        F: FnOnce(Result<Value, RunError>) + Send + 'static,
    {
        let max_concurrent = self.config.limits.max_concurrent;
        let guard = ActiveGuard::acquire(&self.active, max_concurrent).ok_or(
            EvaluationFailure::ResourceExceeded {
                resource: "concurrent evaluations",
                limit: max_concurrent,
            },
        )?;

        let interrupt = Interrupt::new(evaluation.started.checked_add(evaluation.budget));
        let worker_interrupt = interrupt.clone();
        let builtins = Arc::clone(&self.builtins);
        let limits = self.config.limits.runtime();
        thread::Builder::new()
            .name(format!("formlogic-{}", evaluation.id))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let _guard = guard;
                let result = run_script(
                    &request.script,
                    &request.bindings,
                    builtins,
                    &limits,
                    worker_interrupt,
                );
                deliver(result);
            })
            .map_err(|e| {
                warn!(evaluation_id = %evaluation.id, error = %e, "cannot start evaluation worker");
                EvaluationFailure::ResourceExceeded {
                    resource: "worker threads",
                    limit: max_concurrent,
                }
            })?;
        Ok(interrupt)
    }

    fn to_outcome(
        &self,
        evaluation: &Evaluation,
        result: Result<Value, RunError>,
    ) -> Result<Value, EvaluationFailure> {
        result.map_err(|e| match e {
            RunError::Compile(e) => EvaluationFailure::CompileError {
                message: e.message,
                line: e.line,
                column: e.column,
            },
            RunError::Runtime { message } => EvaluationFailure::RuntimeError { message },
            RunError::ResourceExceeded { resource, limit } => {
                EvaluationFailure::ResourceExceeded { resource, limit }
            }
            RunError::Interrupted => EvaluationFailure::Timeout {
                budget_ms: evaluation.budget_ms(),
            },
        })
    }

    fn finish(
        &self,
        evaluation: &Evaluation,
        outcome: Result<Value, EvaluationFailure>,
    ) -> Result<EvaluationResult, Error> {
        let record = evaluation.record();
        let elapsed_ms = record.elapsed.as_millis() as u64;
        match &outcome {
            Ok(_) => debug!(evaluation_id = %record.id, elapsed_ms, "evaluation succeeded"),
            Err(failure) => {
                if let EvaluationFailure::Timeout { .. } = failure {
                    self.hooks.invoke::<EvaluationTimedOut>(&record)?;
                }
                if failure.is_abuse_signal() {
                    self.audit(&record, failure)?;
                } else {
                    debug!(
                        evaluation_id = %record.id,
                        elapsed_ms,
                        kind = failure.kind(),
                        "evaluation failed: {}",
                        failure
                    );
                }
            }
        }
        let result = EvaluationResult::from(outcome);
        Ok(self.hooks.alter::<AfterEvaluate>(result, &record)?)
    }

    fn audit(&self, record: &EvaluationRecord, failure: &EvaluationFailure) -> Result<(), Error> {
        let line = LogLine {
            evaluation_id: record.id,
            kind: failure.kind(),
            message: failure.to_string(),
        };
        if self.hooks.alter::<EmitLog>(true, &line)? {
            warn!(
                evaluation_id = %line.evaluation_id,
                elapsed_ms = record.elapsed.as_millis() as u64,
                budget_ms = record.budget.as_millis() as u64,
                kind = line.kind,
                "{}",
                line.message
            );
        }
        Ok(())
    }
}

impl Evaluator for Sandbox {
    fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResult, Error> {
        Sandbox::evaluate(self, request)
    }
}

fn worker_lost() -> EvaluationFailure {
    EvaluationFailure::RuntimeError {
        message: "Evaluation worker stopped unexpectedly".to_string(),
    }
}
