use std::cmp::Ordering;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::Heap;
use crate::runner::ds::operations::type_conversion::{string_to_number, to_number, to_primitive};
use crate::runner::ds::value::JsValue;

/// `===`. Heap values compare by identity.
pub fn strict_equality(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) => x == y,
        _ => a == b,
    }
}

/// SameValueZero, used by `includes`: like `===` except NaN equals NaN.
pub fn same_value_zero(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Number(x), JsValue::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => strict_equality(a, b),
    }
}

/// `==`.
pub fn loose_equality(a: &JsValue, b: &JsValue, heap: &Heap) -> Result<bool, JErrorType> {
    Ok(match (a, b) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        (JsValue::Number(x), JsValue::String(s)) => *x == string_to_number(s),
        (JsValue::String(s), JsValue::Number(y)) => string_to_number(s) == *y,
        (JsValue::Boolean(_), _) => {
            loose_equality(&JsValue::Number(to_number(a, heap)?), b, heap)?
        }
        (_, JsValue::Boolean(_)) => {
            loose_equality(a, &JsValue::Number(to_number(b, heap)?), heap)?
        }
        (
            JsValue::Object(_) | JsValue::BuiltIn(_) | JsValue::Function(_),
            JsValue::Number(_) | JsValue::String(_),
        ) => loose_equality(&to_primitive(a, heap)?, b, heap)?,
        (
            JsValue::Number(_) | JsValue::String(_),
            JsValue::Object(_) | JsValue::BuiltIn(_) | JsValue::Function(_),
        ) => loose_equality(a, &to_primitive(b, heap)?, heap)?,
        _ => strict_equality(a, b),
    })
}

/// Abstract relational comparison. `None` means the operands are unordered
/// (a NaN was involved), which makes every relational operator false.
pub fn compare_values(
    a: &JsValue,
    b: &JsValue,
    heap: &Heap,
) -> Result<Option<Ordering>, JErrorType> {
    let pa = to_primitive(a, heap)?;
    let pb = to_primitive(b, heap)?;
    if let (JsValue::String(x), JsValue::String(y)) = (&pa, &pb) {
        return Ok(Some(compare_strings(x, y)));
    }
    let x = to_number(&pa, heap)?;
    let y = to_number(&pb, heap)?;
    Ok(x.partial_cmp(&y))
}

/// Strings order by UTF-16 code units.
pub fn compare_strings(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
