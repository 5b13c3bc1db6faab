//! Built-in objects visible to scripts.
//!
//! Identifier lookup falls through to the registry after the scope chain:
//!
//! ```text
//! 1. Block scopes (innermost first)
//! 2. Script scope: host bindings and hoisted `var`s
//! 3. Global functions and constants (`parseInt`, `NaN`)
//! 4. Built-in objects (`Math`, `JSON`, ...)
//! ```
//!
//! The registry is shared read-only between evaluations, so nothing a script
//! does to a built-in can leak into another run. Hosts can add objects with
//! [`BuiltInRegistry::register_object`] before handing the registry to a sandbox.
//!
//! ```
//! use formlogic::runner::plugin::{BuiltInObject, BuiltInRegistry};
//! use formlogic::runner::ds::value::JsValue;
//!
//! let mut registry = BuiltInRegistry::with_core();
//! registry.register_object(
//!     BuiltInObject::new("Tax").add_property("RATE", JsValue::Number(0.2)),
//! );
//! assert!(registry.has_object("Tax"));
//! ```

pub mod registry;
pub mod types;

pub use registry::BuiltInRegistry;
pub use types::{BuiltInFn, BuiltInObject, EvalContext, NativeFn};
