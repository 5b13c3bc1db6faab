//! String built-in.
//!
//! Provides String constructor and prototype methods. Positions and lengths
//! count UTF-16 code units, as scripts expect.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::relative_index;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::{number_arg, string_arg};

/// Register the String built-in with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let string = BuiltInObject::new("String")
        .with_constructor(string_constructor)
        .add_method("fromCharCode", string_from_char_code)
        .add_prototype_method("charAt", string_char_at)
        .add_prototype_method("charCodeAt", string_char_code_at)
        .add_prototype_method("indexOf", string_index_of)
        .add_prototype_method("lastIndexOf", string_last_index_of)
        .add_prototype_method("includes", string_includes)
        .add_prototype_method("startsWith", string_starts_with)
        .add_prototype_method("endsWith", string_ends_with)
        .add_prototype_method("slice", string_slice)
        .add_prototype_method("substring", string_substring)
        .add_prototype_method("split", string_split)
        .add_prototype_method("trim", string_trim)
        .add_prototype_method("trimStart", string_trim_start)
        .add_prototype_method("trimEnd", string_trim_end)
        .add_prototype_method("toUpperCase", string_to_upper_case)
        .add_prototype_method("toLowerCase", string_to_lower_case)
        .add_prototype_method("repeat", string_repeat)
        .add_prototype_method("padStart", string_pad_start)
        .add_prototype_method("padEnd", string_pad_end)
        .add_prototype_method("replace", string_replace)
        .add_prototype_method("concat", string_concat)
        .add_prototype_method("toString", string_to_string);

    registry.register_object(string);
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

fn this_string(ctx: &EvalContext, this: &JsValue) -> Result<String, JErrorType> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(
            "String.prototype method called on null or undefined".to_string(),
        )),
        other => ctx.to_js_string(other),
    }
}

/// Reject results that would exceed the string ceiling before building them.
fn check_length(ctx: &EvalContext, bytes: usize) -> Result<(), JErrorType> {
    let limit = ctx.limits().max_string_bytes;
    if bytes > limit {
        Err(JErrorType::ResourceExceeded {
            resource: "string length",
            limit,
        })
    } else {
        Ok(())
    }
}

/// First index of `needle` in `haystack` at or after `from`.
fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

/// String constructor.
fn string_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    match args.first() {
        None => Ok(JsValue::String(String::new())),
        Some(v) => {
            let s = ctx.to_js_string(v)?;
            ctx.new_string(s)
        }
    }
}

/// String.fromCharCode
fn string_from_char_code(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let mut codes = Vec::with_capacity(args.len());
    for a in &args {
        let n = ctx.to_number(a)?;
        codes.push(if n.is_finite() { (n.trunc() as i64 & 0xFFFF) as u16 } else { 0 });
    }
    ctx.new_string(from_units(&codes))
}

/// String.prototype.charAt
fn string_char_at(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let index = number_arg(ctx, &args, 0, 0.0)?.trunc();
    if index < 0.0 || index >= s.len() as f64 || index.is_nan() {
        return Ok(JsValue::String(String::new()));
    }
    Ok(JsValue::String(from_units(&s[index as usize..index as usize + 1])))
}

/// String.prototype.charCodeAt
fn string_char_code_at(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let index = number_arg(ctx, &args, 0, 0.0)?.trunc();
    if index < 0.0 || index >= s.len() as f64 || index.is_nan() {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(s[index as usize] as f64))
}

/// String.prototype.indexOf
fn string_index_of(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let needle = units(&string_arg(ctx, &args, 0)?);
    let from = number_arg(ctx, &args, 1, 0.0)?;
    let from = if from.is_nan() { 0.0 } else { from.max(0.0) };
    Ok(JsValue::Number(
        find_units(&s, &needle, (from.min(s.len() as f64)) as usize)
            .map(|i| i as f64)
            .unwrap_or(-1.0),
    ))
}

/// String.prototype.lastIndexOf
fn string_last_index_of(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let needle = units(&string_arg(ctx, &args, 0)?);
    let from = number_arg(ctx, &args, 1, f64::INFINITY)?;
    let from = if from.is_nan() { f64::INFINITY } else { from.max(0.0) };
    if needle.len() > s.len() {
        return Ok(JsValue::Number(-1.0));
    }
    let start = (from.min((s.len() - needle.len()) as f64)) as usize;
    let found = (0..=start)
        .rev()
        .find(|&i| s[i..].starts_with(&needle));
    Ok(JsValue::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

/// String.prototype.includes
fn string_includes(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let needle = units(&string_arg(ctx, &args, 0)?);
    let from = number_arg(ctx, &args, 1, 0.0)?;
    let from = relative_clamp(from, s.len());
    Ok(JsValue::Boolean(find_units(&s, &needle, from).is_some()))
}

/// Clamp a non-relative position argument into `0..=len`.
fn relative_clamp(n: f64, len: usize) -> usize {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.min(len as f64) as usize
    }
}

/// String.prototype.startsWith
fn string_starts_with(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let needle = units(&string_arg(ctx, &args, 0)?);
    let from = relative_clamp(number_arg(ctx, &args, 1, 0.0)?, s.len());
    Ok(JsValue::Boolean(s[from..].starts_with(&needle)))
}

/// String.prototype.endsWith
fn string_ends_with(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let needle = units(&string_arg(ctx, &args, 0)?);
    let end = relative_clamp(number_arg(ctx, &args, 1, s.len() as f64)?, s.len());
    Ok(JsValue::Boolean(s[..end].ends_with(&needle)))
}

/// String.prototype.slice
fn string_slice(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let start = relative_index(number_arg(ctx, &args, 0, 0.0)?, s.len());
    let end = relative_index(number_arg(ctx, &args, 1, s.len() as f64)?, s.len());
    if start >= end {
        return Ok(JsValue::String(String::new()));
    }
    Ok(JsValue::String(from_units(&s[start..end])))
}

/// String.prototype.substring
fn string_substring(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = units(&this_string(ctx, &this)?);
    let start = relative_clamp(number_arg(ctx, &args, 0, 0.0)?, s.len());
    let end = relative_clamp(number_arg(ctx, &args, 1, s.len() as f64)?, s.len());
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(JsValue::String(from_units(&s[start..end])))
}

/// String.prototype.split
fn string_split(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = this_string(ctx, &this)?;
    let limit = match args.get(1) {
        None | Some(JsValue::Undefined) => usize::MAX,
        Some(v) => {
            let n = ctx.to_number(v)?;
            if n.is_finite() && n > 0.0 {
                (n.trunc() as u64).min(u32::MAX as u64) as usize
            } else if n == f64::INFINITY {
                u32::MAX as usize
            } else {
                0
            }
        }
    };
    let parts: Vec<String> = match args.first() {
        None | Some(JsValue::Undefined) => vec![s],
        Some(separator) => {
            let separator = ctx.to_js_string(separator)?;
            if separator.is_empty() {
                s.encode_utf16().map(|u| from_units(&[u])).collect()
            } else {
                s.split(separator.as_str()).map(str::to_string).collect()
            }
        }
    };
    let elements = parts
        .into_iter()
        .take(limit)
        .map(JsValue::String)
        .collect();
    ctx.new_array(elements)
}

/// String.prototype.trim
fn string_trim(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_string(ctx, &this)?.trim().to_string()))
}

/// String.prototype.trimStart
fn string_trim_start(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(
        this_string(ctx, &this)?.trim_start().to_string(),
    ))
}

/// String.prototype.trimEnd
fn string_trim_end(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_string(ctx, &this)?.trim_end().to_string()))
}

/// String.prototype.toUpperCase
fn string_to_upper_case(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let upper = this_string(ctx, &this)?.to_uppercase();
    ctx.new_string(upper)
}

/// String.prototype.toLowerCase
fn string_to_lower_case(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let lower = this_string(ctx, &this)?.to_lowercase();
    ctx.new_string(lower)
}

/// String.prototype.repeat
fn string_repeat(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = this_string(ctx, &this)?;
    let count = number_arg(ctx, &args, 0, 0.0)?;
    let count = if count.is_nan() { 0.0 } else { count.trunc() };
    if count < 0.0 || count.is_infinite() {
        return Err(JErrorType::RangeError(format!(
            "Invalid count value: {}",
            JsValue::Number(count)
        )));
    }
    if s.is_empty() || count == 0.0 {
        return Ok(JsValue::String(String::new()));
    }
    check_length(ctx, (s.len() as f64 * count).min(usize::MAX as f64) as usize)?;
    let repeated = s.repeat(count as usize);
    ctx.new_string(repeated)
}

fn pad(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>, at_start: bool) -> Result<JsValue, JErrorType> {
    let s = this_string(ctx, &this)?;
    let target = number_arg(ctx, &args, 0, 0.0)?;
    let filler = match args.get(1) {
        None | Some(JsValue::Undefined) => " ".to_string(),
        Some(v) => ctx.to_js_string(v)?,
    };
    let current = s.encode_utf16().count();
    if target.is_nan() || target <= current as f64 || filler.is_empty() {
        return Ok(JsValue::String(s));
    }
    check_length(ctx, target.min(usize::MAX as f64) as usize)?;
    let missing = target as usize - current;
    let filler_units = units(&filler);
    let padding: Vec<u16> = filler_units.iter().copied().cycle().take(missing).collect();
    let padding = from_units(&padding);
    let padded = if at_start {
        padding + &s
    } else {
        s + &padding
    };
    ctx.new_string(padded)
}

/// String.prototype.padStart
fn string_pad_start(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    pad(ctx, this, args, true)
}

/// String.prototype.padEnd
fn string_pad_end(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    pad(ctx, this, args, false)
}

/// String.prototype.replace: first occurrence of a literal pattern. The
/// replacement understands `$$`, `$&`, `` $` `` and `$'`.
fn string_replace(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let s = this_string(ctx, &this)?;
    let pattern = string_arg(ctx, &args, 0)?;
    let replacement = string_arg(ctx, &args, 1)?;
    let Some(at) = s.find(pattern.as_str()) else {
        return Ok(JsValue::String(s));
    };
    let before = &s[..at];
    let after = &s[at + pattern.len()..];

    let mut expanded = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            expanded.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => expanded.push('$'),
            Some('&') => expanded.push_str(&pattern),
            Some('`') => expanded.push_str(before),
            Some('\'') => expanded.push_str(after),
            _ => {
                expanded.push('$');
                continue;
            }
        }
        chars.next();
    }
    check_length(ctx, before.len() + expanded.len() + after.len())?;
    let result = format!("{}{}{}", before, expanded, after);
    ctx.new_string(result)
}

/// String.prototype.concat
fn string_concat(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let mut s = this_string(ctx, &this)?;
    for a in &args {
        s.push_str(&ctx.to_js_string(a)?);
        check_length(ctx, s.len())?;
    }
    ctx.new_string(s)
}

/// String.prototype.toString
fn string_to_string(
    ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_string(ctx, &this)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_units() {
        let hay = units("banana");
        assert_eq!(find_units(&hay, &units("an"), 0), Some(1));
        assert_eq!(find_units(&hay, &units("an"), 2), Some(3));
        assert_eq!(find_units(&hay, &units("x"), 0), None);
        assert_eq!(find_units(&hay, &units(""), 10), Some(6));
    }

    #[test]
    fn test_relative_clamp() {
        assert_eq!(relative_clamp(-3.0, 5), 0);
        assert_eq!(relative_clamp(f64::NAN, 5), 0);
        assert_eq!(relative_clamp(2.7, 5), 2);
        assert_eq!(relative_clamp(99.0, 5), 5);
    }
}
