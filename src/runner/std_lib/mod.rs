//! Standard library built-in objects.
//!
//! This module contains the read-only library every script can reach:
//! Math, Number, String, Boolean, Array, Object, JSON, the Error factories
//! and the global functions.

pub mod array;
pub mod core;
pub mod error;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

pub use self::core::register_core_builtins;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

/// Argument `i`, or `undefined` when absent.
pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

/// Argument `i` converted to a number, or `default` when absent or undefined.
pub(crate) fn number_arg(
    ctx: &EvalContext,
    args: &[JsValue],
    i: usize,
    default: f64,
) -> Result<f64, JErrorType> {
    match args.get(i) {
        None | Some(JsValue::Undefined) => Ok(default),
        Some(v) => ctx.to_number(v),
    }
}

/// Argument `i` converted to a string; absent arguments read as "undefined".
pub(crate) fn string_arg(ctx: &EvalContext, args: &[JsValue], i: usize) -> Result<String, JErrorType> {
    ctx.to_js_string(&arg(args, i))
}
