//! Property access on script values.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{array_index, HeapCell};
use crate::runner::ds::value::{JsValue, NativeFunctionRef};
use crate::runner::plugin::types::EvalContext;

/// Registry object whose prototype methods apply to `v`, if any.
fn prototype_of(v: &JsValue, ctx: &EvalContext) -> Option<&'static str> {
    match v {
        JsValue::String(_) => Some("String"),
        JsValue::Number(_) => Some("Number"),
        JsValue::Boolean(_) => Some("Boolean"),
        JsValue::Object(r) if ctx.heap.is_array(*r) => Some("Array"),
        JsValue::Object(_) => Some("Object"),
        _ => None,
    }
}

fn prototype_method(v: &JsValue, key: &str, ctx: &EvalContext) -> Option<JsValue> {
    let proto = prototype_of(v, ctx)?;
    if ctx.registry().has_prototype_method(proto, key) {
        Some(JsValue::Function(NativeFunctionRef::new_prototype(proto, key)))
    } else if proto == "Array" && ctx.registry().has_prototype_method("Object", key) {
        // Arrays inherit the object methods.
        Some(JsValue::Function(NativeFunctionRef::new_prototype("Object", key)))
    } else {
        None
    }
}

pub fn get_property(ctx: &EvalContext, base: &JsValue, key: &str) -> Result<JsValue, JErrorType> {
    match base {
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read properties of {} (reading '{}')",
            base, key
        ))),
        JsValue::String(s) => {
            if key == "length" {
                return Ok(JsValue::Number(s.encode_utf16().count() as f64));
            }
            if let Some(index) = array_index(key) {
                let unit = s.encode_utf16().nth(index as usize);
                return Ok(match unit {
                    Some(unit) => JsValue::String(String::from_utf16_lossy(&[unit])),
                    None => JsValue::Undefined,
                });
            }
            Ok(prototype_method(base, key, ctx).unwrap_or(JsValue::Undefined))
        }
        JsValue::Object(r) => {
            let own = match ctx.heap.get(*r) {
                HeapCell::Array(elements) => {
                    if key == "length" {
                        Some(JsValue::Number(elements.len() as f64))
                    } else {
                        array_index(key).map(|i| {
                            elements
                                .get(i as usize)
                                .cloned()
                                .unwrap_or(JsValue::Undefined)
                        })
                    }
                }
                HeapCell::Object(data) => data.get(key).cloned(),
            };
            Ok(own
                .or_else(|| prototype_method(base, key, ctx))
                .unwrap_or(JsValue::Undefined))
        }
        JsValue::BuiltIn(name) => {
            let registry = ctx.registry();
            if let Some(obj) = registry.get_object(name) {
                if let Some(value) = obj.properties.get(key) {
                    return Ok(value.clone());
                }
                if obj.methods.contains_key(key) {
                    return Ok(JsValue::Function(NativeFunctionRef::new_static(
                        name.as_str(),
                        key,
                    )));
                }
            }
            Ok(JsValue::Undefined)
        }
        JsValue::Function(f) => Ok(if key == "name" {
            JsValue::String(f.name.clone())
        } else {
            JsValue::Undefined
        }),
        JsValue::Number(_) | JsValue::Boolean(_) => {
            Ok(prototype_method(base, key, ctx).unwrap_or(JsValue::Undefined))
        }
    }
}

pub fn set_property(
    ctx: &mut EvalContext,
    base: &JsValue,
    key: String,
    value: JsValue,
) -> Result<(), JErrorType> {
    match base {
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot set properties of {} (setting '{}')",
            base, key
        ))),
        JsValue::BuiltIn(name) => Err(JErrorType::TypeError(format!(
            "Cannot assign to read only property '{}' of object '{}'",
            key, name
        ))),
        JsValue::Object(r) => {
            let r = *r;
            if ctx.heap.is_array(r) {
                if key == "length" {
                    let length = ctx.to_number(&value)?;
                    if length < 0.0 || length.fract() != 0.0 || length > u32::MAX as f64 {
                        return Err(JErrorType::RangeError("Invalid array length".to_string()));
                    }
                    return ctx.heap.array_set_length(r, length as usize);
                }
                match array_index(&key) {
                    Some(index) => ctx.heap.array_set(r, index as usize, value),
                    None => Ok(()),
                }
            } else {
                ctx.heap.object_set(r, key, value)
            }
        }
        _ => Ok(()),
    }
}

/// The `in` operator.
pub fn has_property(ctx: &EvalContext, key: &str, target: &JsValue) -> Result<bool, JErrorType> {
    match target {
        JsValue::Object(r) => Ok(match ctx.heap.get(*r) {
            HeapCell::Array(elements) => {
                key == "length"
                    || array_index(key)
                        .map(|i| (i as usize) < elements.len())
                        .unwrap_or(false)
            }
            HeapCell::Object(data) => data.contains_key(key),
        }),
        JsValue::BuiltIn(name) => Ok(ctx
            .registry()
            .get_object(name)
            .map(|obj| obj.properties.contains_key(key) || obj.methods.contains_key(key))
            .unwrap_or(false)),
        other => Err(JErrorType::TypeError(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key, other
        ))),
    }
}

/// Own enumerable keys, as visited by `for...in` and `Object.keys`.
pub fn own_keys(ctx: &EvalContext, v: &JsValue) -> Vec<String> {
    match v {
        JsValue::Object(r) => match ctx.heap.get(*r) {
            HeapCell::Array(elements) => (0..elements.len()).map(|i| i.to_string()).collect(),
            HeapCell::Object(data) => data.keys(),
        },
        JsValue::String(s) => (0..s.encode_utf16().count())
            .map(|i| i.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

