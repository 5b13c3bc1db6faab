//! Hook/alter extension registry.
//!
//! Host code attaches handlers to named extension points. `invoke` runs them
//! for their side effects and reports whether any exist; `alter` threads a
//! value through them in registration order.

pub mod config;
pub mod point;
pub mod registry;

pub use config::HookConfig;
pub use point::{
    AfterEvaluate, BeforeEvaluate, ConfigureSandbox, Dynamic, EmitLog, EvaluationTimedOut,
    HookPoint, HookSignature, InstallEvaluator,
};
pub use registry::HookRegistry;
