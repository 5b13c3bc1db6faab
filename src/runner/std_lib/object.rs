//! Object built-in.
//!
//! Provides the `Object` key/value helpers and `hasOwnProperty`.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{array_index, HeapCell};
use crate::runner::ds::operations::object::{get_property, own_keys};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::{arg, string_arg};

/// Register the Object built-in with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let object = BuiltInObject::new("Object")
        .add_method("keys", object_keys)
        .add_method("values", object_values)
        .add_method("entries", object_entries)
        .add_prototype_method("hasOwnProperty", object_has_own_property);

    registry.register_object(object);
}

fn coercible(value: JsValue) -> Result<JsValue, JErrorType> {
    if value.is_nullish() {
        Err(JErrorType::TypeError(
            "Cannot convert undefined or null to object".to_string(),
        ))
    } else {
        Ok(value)
    }
}

/// Object.keys
fn object_keys(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let target = coercible(arg(&args, 0))?;
    let keys = own_keys(ctx, &target)
        .into_iter()
        .map(JsValue::String)
        .collect();
    ctx.new_array(keys)
}

/// Object.values
fn object_values(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let target = coercible(arg(&args, 0))?;
    let mut values = Vec::new();
    for key in own_keys(ctx, &target) {
        values.push(get_property(ctx, &target, &key)?);
    }
    ctx.new_array(values)
}

/// Object.entries
fn object_entries(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let target = coercible(arg(&args, 0))?;
    let mut entries = Vec::new();
    for key in own_keys(ctx, &target) {
        let value = get_property(ctx, &target, &key)?;
        entries.push(ctx.new_array(vec![JsValue::String(key), value])?);
    }
    ctx.new_array(entries)
}

/// Object.prototype.hasOwnProperty
fn object_has_own_property(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let key = string_arg(ctx, &args, 0)?;
    let own = match &this {
        JsValue::Object(r) => match ctx.heap.get(*r) {
            HeapCell::Object(data) => data.contains_key(&key),
            HeapCell::Array(elements) => {
                key == "length"
                    || array_index(&key)
                        .map(|i| (i as usize) < elements.len())
                        .unwrap_or(false)
            }
        },
        _ => false,
    };
    Ok(JsValue::Boolean(own))
}
