//! JSON built-in object.
//!
//! Provides JSON.parse and JSON.stringify on top of `serde_json`.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Number, Value as Json};

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{HeapCell, HeapRef, ObjectData};
use crate::runner::ds::operations::type_conversion::MAX_VALUE_DEPTH;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::{arg, string_arg};

/// Widest indentation `JSON.stringify` honours.
const MAX_INDENT: usize = 10;

/// Register the JSON object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let json = BuiltInObject::new("JSON")
        .add_method("parse", json_parse)
        .add_method("stringify", json_stringify);

    registry.register_object(json);
}

/// JSON.parse - Parse JSON string to JavaScript value.
fn json_parse(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let text = string_arg(ctx, &args, 0)?;
    let parsed: Json = serde_json::from_str(&text)
        .map_err(|e| JErrorType::SyntaxError(format!("JSON.parse: {}", e)))?;
    from_json(ctx, parsed)
}

fn from_json(ctx: &mut EvalContext, json: Json) -> Result<JsValue, JErrorType> {
    Ok(match json {
        Json::Null => JsValue::Null,
        Json::Bool(b) => JsValue::Boolean(b),
        Json::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => ctx.new_string(s)?,
        Json::Array(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                ctx.check_interrupt()?;
                elements.push(from_json(ctx, item)?);
            }
            ctx.new_array(elements)?
        }
        Json::Object(map) => {
            let mut data = ObjectData::new();
            for (key, item) in map {
                ctx.check_interrupt()?;
                let value = from_json(ctx, item)?;
                data.insert(key, value);
            }
            ctx.new_object(data)?
        }
    })
}

/// JSON.stringify - Serialize a value. The replacer argument is ignored.
fn json_stringify(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let mut visiting = Vec::new();
    let json = match to_json(ctx, &arg(&args, 0), &mut visiting)? {
        Some(json) => json,
        None => return Ok(JsValue::Undefined),
    };
    let indent = match arg(&args, 2) {
        JsValue::Number(n) if n >= 1.0 => " ".repeat((n as usize).min(MAX_INDENT)),
        JsValue::String(s) => s.chars().take(MAX_INDENT).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
        json.serialize(&mut serializer)
            .map(|_| String::from_utf8_lossy(&out).into_owned())
    }
    .map_err(|e| JErrorType::TypeError(e.to_string()))?;
    ctx.new_string(text)
}

/// JSON form of `v`, or `None` for values JSON has no spelling for.
fn to_json(
    ctx: &EvalContext,
    v: &JsValue,
    visiting: &mut Vec<HeapRef>,
) -> Result<Option<Json>, JErrorType> {
    Ok(Some(match v {
        JsValue::Undefined | JsValue::Function(_) => return Ok(None),
        JsValue::Null => Json::Null,
        JsValue::Boolean(b) => Json::Bool(*b),
        JsValue::Number(n) => number_to_json(*n),
        JsValue::String(s) => Json::String(s.clone()),
        JsValue::BuiltIn(_) => Json::Object(Map::new()),
        JsValue::Object(r) => {
            if visiting.contains(r) {
                return Err(JErrorType::TypeError(
                    "Converting circular structure to JSON".to_string(),
                ));
            }
            if visiting.len() >= MAX_VALUE_DEPTH {
                return Err(JErrorType::ResourceExceeded {
                    resource: "value depth",
                    limit: MAX_VALUE_DEPTH,
                });
            }
            visiting.push(*r);
            let json = match ctx.heap.get(*r) {
                HeapCell::Array(elements) => {
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        items.push(to_json(ctx, element, visiting)?.unwrap_or(Json::Null));
                    }
                    Json::Array(items)
                }
                HeapCell::Object(data) => {
                    let mut map = Map::new();
                    for (key, value) in data.entries() {
                        if let Some(json) = to_json(ctx, &value, visiting)? {
                            map.insert(key, json);
                        }
                    }
                    Json::Object(map)
                }
            };
            visiting.pop();
            json
        }
    }))
}

/// Integral values print without a fraction; non-finite ones become `null`.
pub(crate) fn number_to_json(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Json::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}
