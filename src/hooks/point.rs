//! Extension point types.
//!
//! A point is a zero-sized marker type. Its [`HookSignature`] fixes what flows
//! through `alter` (`Value`) and what every handler may read (`Args`), so a
//! handler with the wrong shape does not compile.

use crate::sandbox::bridge::EvaluatorHandle;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::request::{EvaluationRecord, EvaluationRequest, EvaluationResult, LogLine};
use crate::value::Value;

/// Shape of the handlers an extension point accepts.
pub trait HookSignature: 'static {
    /// Value threaded through `alter` handlers.
    type Value: 'static;
    /// Read-only context passed to every handler.
    type Args: ?Sized + 'static;
}

/// A named extension point with a fixed signature.
pub trait HookPoint: HookSignature {
    const NAME: &'static str;
}

/// Signature of points named at runtime: host values in, host value out.
pub struct Dynamic;

impl HookSignature for Dynamic {
    type Value = Value;
    type Args = [Value];
}

macro_rules! hook_point {
    ($(#[$doc:meta])* $point:ident, $name:expr, $value:ty, $args:ty) => {
        $(#[$doc])*
        pub struct $point;

        impl HookSignature for $point {
            type Value = $value;
            type Args = $args;
        }

        impl HookPoint for $point {
            const NAME: &'static str = $name;
        }
    };
}

hook_point!(
    /// Alter the sandbox options before they are validated.
    ConfigureSandbox,
    "sandbox.configure",
    SandboxConfig,
    ()
);

hook_point!(
    /// Claim evaluator installation at boot. A handler that runs is expected to
    /// register its own evaluator on the handle.
    InstallEvaluator,
    "sandbox.install",
    (),
    EvaluatorHandle
);

hook_point!(
    /// Alter a request before it runs.
    BeforeEvaluate,
    "evaluate.request",
    EvaluationRequest,
    ()
);

hook_point!(
    /// Alter a result before it is returned.
    AfterEvaluate,
    "evaluate.result",
    EvaluationResult,
    EvaluationRecord
);

hook_point!(
    /// Observe an evaluation that ran out of time.
    EvaluationTimedOut,
    "evaluate.timeout",
    (),
    EvaluationRecord
);

hook_point!(
    /// Decide whether an audit line is written. Handlers return `false` to
    /// suppress it.
    EmitLog,
    "log.emit",
    bool,
    LogLine
);
