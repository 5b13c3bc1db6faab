//! Number and Boolean built-ins.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{number_to_string, to_boolean};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::global::{parse_float, parse_int};
use super::{arg, number_arg};

/// Largest integer `n` such that `n` and `n + 1` are both exact.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Register the Number and Boolean built-ins with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let number = BuiltInObject::new("Number")
        .with_constructor(number_constructor)
        .add_property("MAX_SAFE_INTEGER", JsValue::Number(MAX_SAFE_INTEGER))
        .add_property("MIN_SAFE_INTEGER", JsValue::Number(-MAX_SAFE_INTEGER))
        .add_property("MAX_VALUE", JsValue::Number(f64::MAX))
        .add_property("MIN_VALUE", JsValue::Number(5e-324))
        .add_property("EPSILON", JsValue::Number(f64::EPSILON))
        .add_property("POSITIVE_INFINITY", JsValue::Number(f64::INFINITY))
        .add_property("NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY))
        .add_property("NaN", JsValue::Number(f64::NAN))
        .add_method("isInteger", number_is_integer)
        .add_method("isSafeInteger", number_is_safe_integer)
        .add_method("isFinite", number_is_finite)
        .add_method("isNaN", number_is_nan)
        .add_method("parseFloat", parse_float)
        .add_method("parseInt", parse_int)
        .add_prototype_method("toFixed", number_to_fixed)
        .add_prototype_method("toString", number_to_string_method);

    let boolean = BuiltInObject::new("Boolean")
        .with_constructor(boolean_constructor)
        .add_prototype_method("toString", boolean_to_string);

    registry.register_object(number);
    registry.register_object(boolean);
}

fn number_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    match args.first() {
        None => Ok(JsValue::Number(0.0)),
        Some(v) => Ok(JsValue::Number(ctx.to_number(v)?)),
    }
}

/// Numeric argument without coercion, as the `Number.is*` predicates want.
fn strict_number(args: &[JsValue]) -> Option<f64> {
    match args.first() {
        Some(JsValue::Number(n)) => Some(*n),
        _ => None,
    }
}

/// Number.isInteger
fn number_is_integer(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(
        strict_number(&args)
            .map(|n| n.is_finite() && n.trunc() == n)
            .unwrap_or(false),
    ))
}

/// Number.isSafeInteger
fn number_is_safe_integer(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(
        strict_number(&args)
            .map(|n| n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER)
            .unwrap_or(false),
    ))
}

/// Number.isFinite
fn number_is_finite(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(
        strict_number(&args).map(f64::is_finite).unwrap_or(false),
    ))
}

/// Number.isNaN
fn number_is_nan(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(
        strict_number(&args).map(f64::is_nan).unwrap_or(false),
    ))
}

fn this_number(this: &JsValue, method: &str) -> Result<f64, JErrorType> {
    match this {
        JsValue::Number(n) => Ok(*n),
        _ => Err(JErrorType::TypeError(format!(
            "Number.prototype.{} requires that 'this' be a Number",
            method
        ))),
    }
}

/// Number.prototype.toFixed
fn number_to_fixed(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let x = this_number(&this, "toFixed")?;
    let digits = number_arg(ctx, &args, 0, 0.0)?;
    let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
    if !(0.0..=100.0).contains(&digits) {
        return Err(JErrorType::RangeError(
            "toFixed() digits argument must be between 0 and 100".to_string(),
        ));
    }
    if !x.is_finite() || x.abs() >= 1e21 {
        return Ok(JsValue::String(number_to_string(x)));
    }
    Ok(JsValue::String(to_fixed(x, digits as usize)))
}

/// Fixed-point rendering that rounds exact ties away from zero.
fn to_fixed(x: f64, digits: usize) -> String {
    // Exact decimal expansion of the binary value; 1100 places cover every f64.
    let exact = format!("{:.1100}", x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .collect();
    if frac_part.as_bytes().get(digits).copied().unwrap_or(b'0') >= b'5' {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                break;
            }
            i -= 1;
            if kept[i] == b'9' {
                kept[i] = b'0';
            } else {
                kept[i] += 1;
                break;
            }
        }
    }
    let split = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if x < 0.0 {
        out.push('-');
    }
    out.push_str(&String::from_utf8_lossy(&kept[..split]));
    if digits > 0 {
        out.push('.');
        out.push_str(&String::from_utf8_lossy(&kept[split..]));
    }
    out
}

/// Number.prototype.toString
fn number_to_string_method(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let x = this_number(&this, "toString")?;
    let radix = number_arg(ctx, &args, 0, 10.0)?.trunc();
    if !(2.0..=36.0).contains(&radix) {
        return Err(JErrorType::RangeError(
            "toString() radix must be between 2 and 36".to_string(),
        ));
    }
    if radix == 10.0 || !x.is_finite() {
        return Ok(JsValue::String(number_to_string(x)));
    }
    Ok(JsValue::String(to_radix_string(x, radix as u32)))
}

fn to_radix_string(x: f64, radix: u32) -> String {
    let mut int_part = x.abs().trunc();
    let mut frac_part = x.abs() - int_part;
    let mut digits = Vec::new();
    if int_part == 0.0 {
        digits.push('0');
    }
    while int_part >= 1.0 {
        let d = (int_part % radix as f64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int_part = (int_part / radix as f64).trunc();
    }
    let mut out: String = digits.into_iter().rev().collect();
    if frac_part > 0.0 {
        out.push('.');
        for _ in 0..20 {
            frac_part *= radix as f64;
            let d = frac_part.trunc() as u32;
            out.push(std::char::from_digit(d, radix).unwrap_or('0'));
            frac_part -= d as f64;
            if frac_part == 0.0 {
                break;
            }
        }
    }
    if x < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn boolean_constructor(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(to_boolean(&arg(&args, 0))))
}

/// Boolean.prototype.toString
fn boolean_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    match this {
        JsValue::Boolean(b) => Ok(JsValue::String(b.to_string())),
        _ => Err(JErrorType::TypeError(
            "Boolean.prototype.toString requires that 'this' be a Boolean".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed_rounds_ties_up() {
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(1.25, 1), "1.3");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(9.995, 2), "9.99");
        assert_eq!(to_fixed(99.5, 0), "100");
        assert_eq!(to_fixed(-1.5, 0), "-2");
        assert_eq!(to_fixed(0.1, 3), "0.100");
    }

    #[test]
    fn test_to_radix_string() {
        assert_eq!(to_radix_string(255.0, 16), "ff");
        assert_eq!(to_radix_string(-5.0, 2), "-101");
        assert_eq!(to_radix_string(0.5, 2), "0.1");
    }
}
