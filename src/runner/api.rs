//! Entry point of the interpreter: compile, run and convert a script.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::parser::{parse_script, ParseError};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{HeapCell, HeapRef, ObjectData};
use crate::runner::ds::operations::type_conversion::MAX_VALUE_DEPTH;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::statement::{execute_script, hoist_var_declarations};
use crate::runner::eval::CompletionType;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::EvalContext;
use crate::value::Value;

/// Resource ceilings enforced inside one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeLimits {
    pub max_script_bytes: usize,
    pub max_nesting_depth: usize,
    pub max_heap_bytes: usize,
    pub max_string_bytes: usize,
    pub max_collection_length: usize,
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        RuntimeLimits {
            max_script_bytes: 64 * 1024,
            max_nesting_depth: 128,
            max_heap_bytes: 16 * 1024 * 1024,
            max_string_bytes: 1024 * 1024,
            max_collection_length: 100_000,
        }
    }
}

/// Cooperative stop signal shared between a worker and its caller.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn new(deadline: Option<Instant>) -> Self {
        Interrupt {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline,
        }
    }

    /// An interrupt that only fires when cancelled explicitly.
    pub fn never() -> Self {
        Self::new(None)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self) -> bool {
        self.is_cancelled()
            || self
                .deadline
                .map(|deadline| Instant::now() >= deadline)
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("{0}")]
    Compile(ParseError),
    #[error("{message}")]
    Runtime { message: String },
    #[error("{resource} limit of {limit} exceeded")]
    ResourceExceeded { resource: &'static str, limit: usize },
    #[error("Evaluation interrupted")]
    Interrupted,
}

/// Compile and run `script` with `bindings` as its only variables.
///
/// The value is the argument of the first top-level `return`, else the value
/// of the last expression statement executed, else `undefined` (as `Null`).
pub fn run_script(
    script: &str,
    bindings: &BTreeMap<String, Value>,
    registry: Arc<BuiltInRegistry>,
    limits: &RuntimeLimits,
    interrupt: Interrupt,
) -> Result<Value, RunError> {
    if script.len() > limits.max_script_bytes {
        return Err(RunError::ResourceExceeded {
            resource: "script size",
            limit: limits.max_script_bytes,
        });
    }
    let parsed = parse_script(script, limits.max_nesting_depth);
    check_deadline(&interrupt)?;
    let ast = parsed.map_err(RunError::Compile)?;

    let mut ctx =
        EvalContext::new(registry, limits.clone(), interrupt.clone()).with_source(script);
    let outcome = bind_host_values(&mut ctx, bindings).and_then(|_| {
        hoist_var_declarations(&ast.statements, &mut ctx);
        execute_script(&ast, &mut ctx)
    });
    let value = match outcome {
        Ok(completion) if completion.completion_type == CompletionType::Return => {
            completion.get_value()
        }
        Ok(_) => ctx.completion_value.clone(),
        Err(e) => return Err(to_run_error(&ctx, e)),
    };
    let value = to_host_value(&ctx, &value).map_err(|e| to_run_error(&ctx, e))?;
    check_deadline(&interrupt)?;
    Ok(value)
}

/// The interpreter only samples the clock every few steps, so a script that
/// finishes between samples is checked once more here.
fn check_deadline(interrupt: &Interrupt) -> Result<(), RunError> {
    if interrupt.is_expired() {
        Err(RunError::Interrupted)
    } else {
        Ok(())
    }
}

fn bind_host_values(
    ctx: &mut EvalContext,
    bindings: &BTreeMap<String, Value>,
) -> Result<(), JErrorType> {
    for (name, value) in bindings {
        let value = from_host_value(ctx, value, 0)?;
        ctx.scopes.define_global(name, value);
    }
    Ok(())
}

fn to_run_error(ctx: &EvalContext, error: JErrorType) -> RunError {
    match error {
        JErrorType::ResourceExceeded { resource, limit } => {
            RunError::ResourceExceeded { resource, limit }
        }
        JErrorType::Interrupted => RunError::Interrupted,
        JErrorType::Thrown(value) => RunError::Runtime {
            message: describe_thrown(ctx, &value),
        },
        other => RunError::Runtime {
            message: other.to_string(),
        },
    }
}

/// `Name: message` for error-shaped objects, else the value's string form.
fn describe_thrown(ctx: &EvalContext, value: &JsValue) -> String {
    if let JsValue::Object(r) = value {
        if let HeapCell::Object(data) = ctx.heap.get(*r) {
            if let Some(JsValue::String(message)) = data.get("message") {
                let name = match data.get("name") {
                    Some(JsValue::String(name)) => name.as_str(),
                    _ => "Error",
                };
                return if message.is_empty() {
                    name.to_string()
                } else {
                    format!("{}: {}", name, message)
                };
            }
        }
    }
    ctx.to_js_string(value)
        .unwrap_or_else(|_| "Uncaught exception".to_string())
}

pub(crate) fn from_host_value(
    ctx: &mut EvalContext,
    value: &Value,
    depth: usize,
) -> Result<JsValue, JErrorType> {
    if depth > MAX_VALUE_DEPTH {
        return Err(JErrorType::ResourceExceeded {
            resource: "value depth",
            limit: MAX_VALUE_DEPTH,
        });
    }
    Ok(match value {
        Value::Null => JsValue::Null,
        Value::Bool(b) => JsValue::Boolean(*b),
        Value::Number(n) => JsValue::Number(*n),
        Value::String(s) => ctx.new_string(s.clone())?,
        Value::Array(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                elements.push(from_host_value(ctx, item, depth + 1)?);
            }
            ctx.new_array(elements)?
        }
        Value::Object(map) => {
            let mut data = ObjectData::new();
            for (key, item) in map {
                data.insert(key.clone(), from_host_value(ctx, item, depth + 1)?);
            }
            ctx.new_object(data)?
        }
    })
}

/// Convert a script value for the host. `undefined`, non-finite numbers and
/// functions become `Null`.
pub(crate) fn to_host_value(ctx: &EvalContext, value: &JsValue) -> Result<Value, JErrorType> {
    let mut visiting = Vec::new();
    to_host_value_inner(ctx, value, &mut visiting)
}

fn to_host_value_inner(
    ctx: &EvalContext,
    value: &JsValue,
    visiting: &mut Vec<HeapRef>,
) -> Result<Value, JErrorType> {
    Ok(match value {
        JsValue::Undefined | JsValue::Null => Value::Null,
        JsValue::Boolean(b) => Value::Bool(*b),
        JsValue::Number(n) if n.is_finite() => Value::Number(*n),
        JsValue::Number(_) => Value::Null,
        JsValue::String(s) => Value::String(s.clone()),
        JsValue::BuiltIn(_) | JsValue::Function(_) => Value::Null,
        JsValue::Object(r) => {
            if visiting.contains(r) {
                return Err(JErrorType::TypeError(
                    "Converting circular structure to a host value".to_string(),
                ));
            }
            if visiting.len() >= MAX_VALUE_DEPTH {
                return Err(JErrorType::ResourceExceeded {
                    resource: "value depth",
                    limit: MAX_VALUE_DEPTH,
                });
            }
            visiting.push(*r);
            let converted = match ctx.heap.get(*r) {
                HeapCell::Array(elements) => {
                    let mut items = Vec::with_capacity(elements.len());
                    for element in elements {
                        items.push(to_host_value_inner(ctx, element, visiting)?);
                    }
                    Value::Array(items)
                }
                HeapCell::Object(data) => {
                    let mut map = BTreeMap::new();
                    for (key, item) in data.entries() {
                        map.insert(key, to_host_value_inner(ctx, &item, visiting)?);
                    }
                    Value::Object(map)
                }
            };
            visiting.pop();
            converted
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str) -> Result<Value, RunError> {
        run_script(
            script,
            &BTreeMap::new(),
            Arc::new(BuiltInRegistry::with_core()),
            &RuntimeLimits::default(),
            Interrupt::never(),
        )
    }

    #[test]
    fn test_last_expression_is_the_result() {
        assert_eq!(run("1 + 1; 'done'"), Ok(Value::from("done")));
        assert_eq!(run("var x = 3;"), Ok(Value::Null));
    }

    #[test]
    fn test_first_return_wins() {
        assert_eq!(run("return 1; return 2;"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_script_size_limit() {
        let limits = RuntimeLimits {
            max_script_bytes: 4,
            ..RuntimeLimits::default()
        };
        let result = run_script(
            "1 + 2 + 3",
            &BTreeMap::new(),
            Arc::new(BuiltInRegistry::with_core()),
            &limits,
            Interrupt::never(),
        );
        assert_eq!(
            result,
            Err(RunError::ResourceExceeded {
                resource: "script size",
                limit: 4
            })
        );
    }

    #[test]
    fn test_cancelled_interrupt_stops_loop() {
        let interrupt = Interrupt::never();
        interrupt.cancel();
        let result = run_script(
            "while (true) {}",
            &BTreeMap::new(),
            Arc::new(BuiltInRegistry::with_core()),
            &RuntimeLimits::default(),
            interrupt,
        );
        assert_eq!(result, Err(RunError::Interrupted));
    }

    #[test]
    fn test_short_script_past_its_deadline_is_interrupted() {
        // Fewer steps than one clock sample, so only the final check sees it.
        let result = run_script(
            "1 + 1",
            &BTreeMap::new(),
            Arc::new(BuiltInRegistry::with_core()),
            &RuntimeLimits::default(),
            Interrupt::new(Some(Instant::now())),
        );
        assert_eq!(result, Err(RunError::Interrupted));
    }

    #[test]
    fn test_thrown_error_message() {
        assert_eq!(
            run("throw TypeError('bad input')"),
            Err(RunError::Runtime {
                message: "TypeError: bad input".to_string()
            })
        );
        assert_eq!(
            run("throw 'plain'"),
            Err(RunError::Runtime {
                message: "plain".to_string()
            })
        );
    }
}
