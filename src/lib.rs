//! # formlogic - extensible, sandboxed form logic
//!
//! The execution core of a form-definition backend:
//! - A hook/alter registry for intercepting named pipeline steps
//! - A sandboxed interpreter for a small JavaScript subset, used for
//!   calculations, conditional visibility and validation rules written by end
//!   users
//! - A wall-clock timeout and resource ceilings on every evaluation
//! - A registration bridge so the rest of the system finds the active evaluator
//!
//! ## Quick Start
//!
//! ### Booting and evaluating
//!
//! ```
//! use formlogic::boot::{boot, BootConfig};
//! use formlogic::hooks::HookConfig;
//! use formlogic::sandbox::{EvaluationFailure, EvaluationRequest, SandboxConfig};
//! use formlogic::value::Value;
//!
//! let runtime = boot(
//!     BootConfig::new(SandboxConfig::with_timeout_ms(100)),
//!     HookConfig::new(),
//! )
//! .unwrap();
//!
//! let total = runtime
//!     .evaluate(
//!         EvaluationRequest::new("return a + b;")
//!             .with_binding("a", 2)
//!             .with_binding("b", 3),
//!     )
//!     .unwrap();
//! assert_eq!(total.value(), Some(&Value::Number(5.0)));
//!
//! let runaway = runtime
//!     .evaluate(EvaluationRequest::new("while (true) {}"))
//!     .unwrap();
//! assert!(matches!(
//!     runaway.failure(),
//!     Some(EvaluationFailure::Timeout { .. })
//! ));
//! ```
//!
//! ### Intercepting steps with hooks
//!
//! ```
//! use formlogic::boot::{boot, BootConfig};
//! use formlogic::hooks::{AfterEvaluate, EmitLog, HookConfig};
//! use formlogic::sandbox::{EvaluationRequest, EvaluationResult, SandboxConfig};
//! use formlogic::value::Value;
//!
//! let hooks = HookConfig::new()
//!     // Round every numeric result to two decimals.
//!     .alter::<AfterEvaluate>(|result, _record| {
//!         Ok(match result {
//!             EvaluationResult::Success(Value::Number(n)) => {
//!                 EvaluationResult::Success(Value::Number((n * 100.0).round() / 100.0))
//!             }
//!             other => other,
//!         })
//!     })
//!     // Keep timeouts out of the logs.
//!     .alter::<EmitLog>(|_emit, _line| Ok(false));
//!
//! let runtime = boot(BootConfig::new(SandboxConfig::with_timeout_ms(100)), hooks).unwrap();
//! let result = runtime.evaluate(EvaluationRequest::new("10 / 3")).unwrap();
//! assert_eq!(result.value(), Some(&Value::Number(3.33)));
//! ```
//!
//! ## Architecture
//!
//! - **[`hooks`]** - Typed and runtime-named extension points
//! - **[`sandbox`]** - Per-evaluation worker threads, timeouts, the registration bridge
//! - **[`boot`]** - Startup wiring
//! - **[`parser`]** - PEG grammar and AST for the script language
//! - **[`runner`]** - Tree-walking interpreter
//!   - **[`runner::plugin`]** - Built-in objects visible to scripts
//!   - **[`runner::ds`]** - Values, heap, scopes
//!   - **[`runner::eval`]** - Statement and expression evaluation
//! - **[`value`]** - Values that cross the sandbox boundary

#[macro_use]
extern crate lazy_static;

pub mod boot;
pub mod error;
pub mod hooks;
pub mod parser;
pub mod runner;
pub mod sandbox;
pub mod value;

pub use error::{ConfigurationError, Error, HookError, HookRegistrationError};
