//! Global functions and constants: `parseInt`, `parseFloat`, `isNaN`,
//! `isFinite`, `NaN` and `Infinity`.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::{BuiltInRegistry, GLOBAL_OBJECT};
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::{number_arg, string_arg};

pub fn register(registry: &mut BuiltInRegistry) {
    let global = BuiltInObject::new(GLOBAL_OBJECT)
        .add_property("NaN", JsValue::Number(f64::NAN))
        .add_property("Infinity", JsValue::Number(f64::INFINITY))
        .add_method("parseInt", parse_int)
        .add_method("parseFloat", parse_float)
        .add_method("isNaN", is_nan)
        .add_method("isFinite", is_finite);

    registry.register_object(global);
}

/// parseInt(string, radix)
pub(crate) fn parse_int(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let input = string_arg(ctx, &args, 0)?;
    let radix = number_arg(ctx, &args, 1, 0.0)?;
    let radix = if radix.is_finite() { radix.trunc() as i64 } else { 0 };
    Ok(JsValue::Number(parse_int_prefix(&input, radix)))
}

fn parse_int_prefix(input: &str, radix: i64) -> f64 {
    let mut s = input.trim_start();
    let negative = s.starts_with('-');
    if s.starts_with('-') || s.starts_with('+') {
        s = &s[1..];
    }
    let mut radix = radix;
    if radix != 0 && !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if (radix == 0 || radix == 16) && (s.starts_with("0x") || s.starts_with("0X")) {
        s = &s[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }

    let mut value = 0.0;
    let mut digits = 0;
    for c in s.chars() {
        match c.to_digit(radix as u32) {
            Some(d) => {
                value = value * radix as f64 + d as f64;
                digits += 1;
            }
            None => break,
        }
    }
    if digits == 0 {
        f64::NAN
    } else if negative {
        -value
    } else {
        value
    }
}

/// parseFloat(string)
pub(crate) fn parse_float(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let input = string_arg(ctx, &args, 0)?;
    Ok(JsValue::Number(parse_float_prefix(&input)))
}

/// Longest prefix of `input` that reads as a decimal literal.
fn parse_float_prefix(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_start = end + 1;
        if exp_start < bytes.len() && (bytes[exp_start] == b'+' || bytes[exp_start] == b'-') {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// isNaN(value)
fn is_nan(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(number_arg(ctx, &args, 0, f64::NAN)?.is_nan()))
}

/// isFinite(value)
fn is_finite(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(
        number_arg(ctx, &args, 0, f64::NAN)?.is_finite(),
    ))
}
