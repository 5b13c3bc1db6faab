//! Error built-in objects.
//!
//! `Error`, `TypeError`, `RangeError`, `ReferenceError` and `SyntaxError` are
//! factories: calling one yields a `{ name, message }` object, the same shape
//! `catch` receives for errors raised by the runtime.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Register all error types with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    registry.register_object(BuiltInObject::new("Error").with_constructor(error_constructor));
    registry.register_object(
        BuiltInObject::new("TypeError").with_constructor(type_error_constructor),
    );
    registry.register_object(
        BuiltInObject::new("RangeError").with_constructor(range_error_constructor),
    );
    registry.register_object(
        BuiltInObject::new("ReferenceError").with_constructor(reference_error_constructor),
    );
    registry.register_object(
        BuiltInObject::new("SyntaxError").with_constructor(syntax_error_constructor),
    );
}

fn make_error(ctx: &mut EvalContext, name: &str, args: &[JsValue]) -> Result<JsValue, JErrorType> {
    let message = match args.first() {
        None | Some(JsValue::Undefined) => String::new(),
        Some(v) => ctx.to_js_string(v)?,
    };
    ctx.new_error_object(name, &message)
}

fn error_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    make_error(ctx, "Error", &args)
}

fn type_error_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    make_error(ctx, "TypeError", &args)
}

fn range_error_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    make_error(ctx, "RangeError", &args)
}

fn reference_error_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    make_error(ctx, "ReferenceError", &args)
}

fn syntax_error_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    make_error(ctx, "SyntaxError", &args)
}
