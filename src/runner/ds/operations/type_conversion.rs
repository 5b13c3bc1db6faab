use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{Heap, HeapCell, HeapRef};
use crate::runner::ds::value::JsValue;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// Nesting ceiling for recursive conversions of heap values.
pub const MAX_VALUE_DEPTH: usize = 256;

/// Type tag of a value. Constructible built-ins (`Number`, `String`) are
/// reported as functions by the evaluator, which can see the registry.
pub fn get_type(a: &JsValue) -> &'static str {
    match a {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_NULL,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Object(_) | JsValue::BuiltIn(_) => TYPE_STR_OBJECT,
        JsValue::Function(_) => TYPE_STR_FUNCTION,
    }
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => !(*n == 0.0 || n.is_nan()),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) | JsValue::BuiltIn(_) | JsValue::Function(_) => true,
    }
}

/// Reduce an object to its string primitive; primitives pass through.
pub fn to_primitive(v: &JsValue, heap: &Heap) -> Result<JsValue, JErrorType> {
    match v {
        JsValue::Object(_) | JsValue::BuiltIn(_) | JsValue::Function(_) => {
            Ok(JsValue::String(to_string(v, heap)?))
        }
        _ => Ok(v.clone()),
    }
}

pub fn to_number(v: &JsValue, heap: &Heap) -> Result<f64, JErrorType> {
    Ok(match v {
        JsValue::Undefined => f64::NAN,
        JsValue::Null => 0.0,
        JsValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        JsValue::Number(n) => *n,
        JsValue::String(s) => string_to_number(s),
        JsValue::Object(_) => string_to_number(&to_string(v, heap)?),
        JsValue::BuiltIn(_) | JsValue::Function(_) => f64::NAN,
    })
}

/// Numeric value of a string, following the rules of `Number("...")`.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        let mut value = 0.0;
        for c in digits.chars() {
            match c.to_digit(radix) {
                Some(d) => value = value * radix as f64 + d as f64,
                None => return f64::NAN,
            }
        }
        return value;
    }
    let well_formed = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && s.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Shortest round-trip decimal form of a number as JavaScript prints it.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    let repr = format!("{:e}", n);
    let (mantissa, exponent) = match repr.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (repr.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent + 1;

    if k <= point && point <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((point - k) as usize));
        out
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let sign = if e >= 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    }
}

pub fn to_string(v: &JsValue, heap: &Heap) -> Result<String, JErrorType> {
    let mut visiting = Vec::new();
    to_string_inner(v, heap, &mut visiting)
}

/// `Array.prototype.join`: an array already being joined contributes `""`.
pub fn join_array(r: HeapRef, heap: &Heap, separator: &str) -> Result<String, JErrorType> {
    let mut visiting = Vec::new();
    join_inner(r, heap, separator, &mut visiting)
}

fn join_inner(
    r: HeapRef,
    heap: &Heap,
    separator: &str,
    visiting: &mut Vec<HeapRef>,
) -> Result<String, JErrorType> {
    let elements = match heap.get(r) {
        HeapCell::Array(elements) => elements,
        HeapCell::Object(_) => return Ok("[object Object]".to_string()),
    };
    if visiting.contains(&r) {
        return Ok(String::new());
    }
    if visiting.len() >= MAX_VALUE_DEPTH {
        return Err(JErrorType::ResourceExceeded {
            resource: "value depth",
            limit: MAX_VALUE_DEPTH,
        });
    }
    visiting.push(r);
    let mut parts = Vec::with_capacity(elements.len());
    for element in elements {
        parts.push(match element {
            JsValue::Undefined | JsValue::Null => String::new(),
            other => to_string_inner(other, heap, visiting)?,
        });
    }
    visiting.pop();
    Ok(parts.join(separator))
}

fn to_string_inner(
    v: &JsValue,
    heap: &Heap,
    visiting: &mut Vec<HeapRef>,
) -> Result<String, JErrorType> {
    match v {
        JsValue::Object(r) => join_inner(*r, heap, ",", visiting),
        other => Ok(other.to_string()),
    }
}

/// Truncate toward zero, mapping NaN to 0 and keeping infinities.
pub fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

/// Resolve a relative index argument (negative counts from the end) into `0..=len`.
pub fn relative_index(n: f64, len: usize) -> usize {
    let n = to_integer_or_infinity(n);
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}

/// Property key form of a value, as used by `obj[key]`.
pub fn to_property_key(v: &JsValue, heap: &Heap) -> Result<String, JErrorType> {
    match v {
        JsValue::String(s) => Ok(s.clone()),
        other => to_string(other, heap),
    }
}
