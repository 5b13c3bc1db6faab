//! Array built-in.
//!
//! Provides Array constructor and prototype methods.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{HeapCell, HeapRef};
use crate::runner::ds::operations::test_and_comparison::{
    compare_strings, same_value_zero, strict_equality,
};
use crate::runner::ds::operations::type_conversion::{join_array, relative_index};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::{arg, number_arg};

/// Register the Array built-in with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let array = BuiltInObject::new("Array")
        .with_constructor(array_constructor)
        .add_method("isArray", array_is_array)
        .add_prototype_method("push", array_push)
        .add_prototype_method("pop", array_pop)
        .add_prototype_method("indexOf", array_index_of)
        .add_prototype_method("includes", array_includes)
        .add_prototype_method("join", array_join)
        .add_prototype_method("slice", array_slice)
        .add_prototype_method("concat", array_concat)
        .add_prototype_method("reverse", array_reverse)
        .add_prototype_method("sort", array_sort)
        .add_prototype_method("toString", array_to_string);

    registry.register_object(array);
}

fn this_array(ctx: &EvalContext, this: &JsValue, method: &str) -> Result<HeapRef, JErrorType> {
    match this {
        JsValue::Object(r) if ctx.heap.is_array(*r) => Ok(*r),
        _ => Err(JErrorType::TypeError(format!(
            "Array.prototype.{} called on a non-array",
            method
        ))),
    }
}

fn elements(ctx: &EvalContext, r: HeapRef) -> &[JsValue] {
    match ctx.heap.get(r) {
        HeapCell::Array(elements) => elements,
        HeapCell::Object(_) => &[],
    }
}

/// Array constructor: `Array(n)` makes `n` holes, anything else lists its arguments.
fn array_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    if let [JsValue::Number(n)] = args.as_slice() {
        let n = *n;
        if n < 0.0 || n.trunc() != n || n > u32::MAX as f64 {
            return Err(JErrorType::RangeError("Invalid array length".to_string()));
        }
        let r = match ctx.new_array(Vec::new())? {
            JsValue::Object(r) => r,
            other => return Ok(other),
        };
        ctx.heap.array_set_length(r, n as usize)?;
        return Ok(JsValue::Object(r));
    }
    ctx.new_array(args)
}

/// Array.isArray
fn array_is_array(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(match arg(&args, 0) {
        JsValue::Object(r) => ctx.heap.is_array(r),
        _ => false,
    }))
}

/// Array.prototype.push
fn array_push(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "push")?;
    let mut length = ctx.heap.array_len(r).unwrap_or(0);
    for value in args {
        length = ctx.heap.array_push(r, value)?;
    }
    Ok(JsValue::Number(length as f64))
}

/// Array.prototype.pop
fn array_pop(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "pop")?;
    Ok(ctx.heap.array_pop(r).unwrap_or(JsValue::Undefined))
}

fn search_start(ctx: &EvalContext, args: &[JsValue], len: usize) -> Result<usize, JErrorType> {
    Ok(relative_index(number_arg(ctx, args, 1, 0.0)?, len))
}

/// Array.prototype.indexOf
fn array_index_of(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "indexOf")?;
    let target = arg(&args, 0);
    let items = elements(ctx, r);
    let from = search_start(ctx, &args, items.len())?;
    let found = items[from..]
        .iter()
        .position(|v| strict_equality(v, &target))
        .map(|i| (i + from) as f64);
    Ok(JsValue::Number(found.unwrap_or(-1.0)))
}

/// Array.prototype.includes
fn array_includes(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "includes")?;
    let target = arg(&args, 0);
    let items = elements(ctx, r);
    let from = search_start(ctx, &args, items.len())?;
    Ok(JsValue::Boolean(
        items[from..].iter().any(|v| same_value_zero(v, &target)),
    ))
}

fn join_with(ctx: &mut EvalContext, r: HeapRef, separator: &str) -> Result<JsValue, JErrorType> {
    let joined = join_array(r, &ctx.heap, separator)?;
    ctx.new_string(joined)
}

/// Array.prototype.join
fn array_join(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "join")?;
    let separator = match args.first() {
        None | Some(JsValue::Undefined) => ",".to_string(),
        Some(v) => ctx.to_js_string(v)?,
    };
    join_with(ctx, r, &separator)
}

/// Array.prototype.toString
fn array_to_string(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "toString")?;
    join_with(ctx, r, ",")
}

/// Array.prototype.slice
fn array_slice(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "slice")?;
    let len = ctx.heap.array_len(r).unwrap_or(0);
    let start = relative_index(number_arg(ctx, &args, 0, 0.0)?, len);
    let end = relative_index(number_arg(ctx, &args, 1, len as f64)?, len);
    let copied = if start < end {
        elements(ctx, r)[start..end].to_vec()
    } else {
        Vec::new()
    };
    ctx.new_array(copied)
}

/// Array.prototype.concat: array arguments are spread one level.
fn array_concat(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "concat")?;
    let mut combined = elements(ctx, r).to_vec();
    for value in args {
        match value {
            JsValue::Object(other) if ctx.heap.is_array(other) => {
                combined.extend_from_slice(elements(ctx, other));
            }
            value => combined.push(value),
        }
    }
    ctx.new_array(combined)
}

/// Array.prototype.reverse
fn array_reverse(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "reverse")?;
    if let Some(items) = ctx.heap.array_mut(r) {
        items.reverse();
    }
    Ok(this)
}

/// Array.prototype.sort: compares string forms, `undefined` sorts last.
/// Comparator functions cannot be written in scripts, so one is rejected.
fn array_sort(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let r = this_array(ctx, &this, "sort")?;
    if !matches!(arg(&args, 0), JsValue::Undefined) {
        return Err(JErrorType::TypeError(
            "The comparison function must be either a function or undefined".to_string(),
        ));
    }
    let mut keyed = Vec::new();
    let mut undefined_count = 0;
    for element in elements(ctx, r) {
        match element {
            JsValue::Undefined => undefined_count += 1,
            other => keyed.push((ctx.to_js_string(other)?, other.clone())),
        }
    }
    keyed.sort_by(|(a, _), (b, _)| compare_strings(a, b));
    let mut sorted: Vec<JsValue> = keyed.into_iter().map(|(_, v)| v).collect();
    sorted.extend(std::iter::repeat(JsValue::Undefined).take(undefined_count));
    if let Some(items) = ctx.heap.array_mut(r) {
        *items = sorted;
    }
    Ok(this)
}

