//! Tests for the built-in library visible to scripts.

extern crate formlogic;

use std::collections::BTreeMap;
use std::sync::Arc;

use formlogic::runner::api::{run_script, Interrupt, RunError, RuntimeLimits};
use formlogic::runner::ds::value::JsValue;
use formlogic::runner::plugin::{BuiltInObject, BuiltInRegistry};
use formlogic::value::Value;

fn run_on(registry: BuiltInRegistry, script: &str) -> Result<Value, RunError> {
    run_script(
        script,
        &BTreeMap::new(),
        Arc::new(registry),
        &RuntimeLimits::default(),
        Interrupt::never(),
    )
}

fn eval(script: &str) -> Value {
    match run_on(BuiltInRegistry::with_core(), script) {
        Ok(value) => value,
        Err(e) => panic!("{:?} failed: {}", script, e),
    }
}

fn runtime_error(script: &str) -> String {
    match run_on(BuiltInRegistry::with_core(), script) {
        Err(RunError::Runtime { message }) => message,
        other => panic!("{:?} should fail at run time, got {:?}", script, other),
    }
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn s(text: &str) -> Value {
    Value::from(text)
}

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|item| s(item)).collect())
}

fn numbers(items: &[f64]) -> Value {
    Value::Array(items.iter().map(|n| num(*n)).collect())
}

// ============================================================================
// Math
// ============================================================================

#[test]
fn test_math_constants() {
    assert_eq!(eval("Math.PI"), num(std::f64::consts::PI));
    assert_eq!(eval("Math.E"), num(std::f64::consts::E));
    assert_eq!(eval("Math.SQRT2"), num(std::f64::consts::SQRT_2));
}

#[test]
fn test_math_rounding() {
    assert_eq!(eval("Math.floor(4.7)"), num(4.0));
    assert_eq!(eval("Math.ceil(4.2)"), num(5.0));
    assert_eq!(eval("Math.round(2.5)"), num(3.0));
    assert_eq!(eval("Math.round(-2.5)"), num(-2.0));
    assert_eq!(eval("Math.trunc(-4.7)"), num(-4.0));
    assert_eq!(eval("Math.sign(-3)"), num(-1.0));
    assert_eq!(eval("Math.abs(-42)"), num(42.0));
}

#[test]
fn test_math_min_max() {
    assert_eq!(eval("Math.max(1, 5, 3)"), num(5.0));
    assert_eq!(eval("Math.min(1, 5, 3)"), num(1.0));
    assert_eq!(eval("Math.max()"), Value::Null);
    assert_eq!(eval("Number.isNaN(Math.max(1, 'x'))"), Value::Bool(true));
}

#[test]
fn test_math_functions() {
    assert_eq!(eval("Math.sqrt(16)"), num(4.0));
    assert_eq!(eval("Math.cbrt(27)"), num(3.0));
    assert_eq!(eval("Math.pow(2, 10)"), num(1024.0));
    assert_eq!(eval("Math.hypot(3, 4)"), num(5.0));
    assert_eq!(eval("Math.log10(1000)"), num(3.0));
    assert_eq!(eval("Math.log2(8)"), num(3.0));
    assert_eq!(eval("Math.exp(0)"), num(1.0));
}

#[test]
fn test_math_has_no_random() {
    assert_eq!(eval("typeof Math.random"), s("undefined"));
    assert_eq!(runtime_error("Math.random()"), "TypeError: Math.random is not a function");
}

// ============================================================================
// Number and globals
// ============================================================================

#[test]
fn test_number_conversion() {
    assert_eq!(eval("Number('42')"), num(42.0));
    assert_eq!(eval("Number('  12.5  ')"), num(12.5));
    assert_eq!(eval("Number('')"), num(0.0));
    assert_eq!(eval("Number(true)"), num(1.0));
    assert_eq!(eval("Number(null)"), num(0.0));
    assert_eq!(eval("Number.isNaN(Number('abc'))"), Value::Bool(true));
    assert_eq!(eval("Number('0x10')"), num(16.0));
}

#[test]
fn test_number_predicates() {
    assert_eq!(eval("Number.isInteger(5)"), Value::Bool(true));
    assert_eq!(eval("Number.isInteger(5.5)"), Value::Bool(false));
    assert_eq!(eval("Number.isInteger('5')"), Value::Bool(false));
    assert_eq!(eval("Number.isFinite(1 / 0)"), Value::Bool(false));
    assert_eq!(eval("Number.isSafeInteger(Number.MAX_SAFE_INTEGER)"), Value::Bool(true));
    assert_eq!(eval("Number.isNaN('abc')"), Value::Bool(false));
    assert_eq!(eval("isNaN('abc')"), Value::Bool(true));
    assert_eq!(eval("isFinite('12')"), Value::Bool(true));
}

#[test]
fn test_parse_int_and_float() {
    assert_eq!(eval("parseInt('42px')"), num(42.0));
    assert_eq!(eval("parseInt('  -17')"), num(-17.0));
    assert_eq!(eval("parseInt('ff', 16)"), num(255.0));
    assert_eq!(eval("parseInt('0x1A')"), num(26.0));
    assert_eq!(eval("parseInt('101', 2)"), num(5.0));
    assert_eq!(eval("isNaN(parseInt('abc'))"), Value::Bool(true));
    assert_eq!(eval("parseFloat('3.14abc')"), num(3.14));
    assert_eq!(eval("parseFloat('.5')"), num(0.5));
    assert_eq!(eval("Number.parseFloat('1e3')"), num(1000.0));
}

#[test]
fn test_to_fixed() {
    assert_eq!(eval("(3.14159).toFixed(2)"), s("3.14"));
    assert_eq!(eval("(2.5).toFixed(0)"), s("3"));
    assert_eq!(eval("(1.005).toFixed(2)"), s("1.00"));
    assert_eq!(eval("(-1.5).toFixed(1)"), s("-1.5"));
    assert_eq!(eval("(10).toFixed(3)"), s("10.000"));
    assert!(runtime_error("(1).toFixed(101)").starts_with("RangeError"));
}

#[test]
fn test_number_to_string() {
    assert_eq!(eval("(255).toString(16)"), s("ff"));
    assert_eq!(eval("(5).toString(2)"), s("101"));
    assert_eq!(eval("(1e21).toString()"), s("1e+21"));
    assert_eq!(eval("String(0.000001)"), s("0.000001"));
    assert_eq!(eval("String(1e-7)"), s("1e-7"));
    assert_eq!(eval("String(-0)"), s("0"));
}

#[test]
fn test_boolean() {
    assert_eq!(eval("Boolean('')"), Value::Bool(false));
    assert_eq!(eval("Boolean('0')"), Value::Bool(true));
    assert_eq!(eval("Boolean(0)"), Value::Bool(false));
    assert_eq!(eval("(true).toString()"), s("true"));
}

// ============================================================================
// String
// ============================================================================

#[test]
fn test_string_conversion() {
    assert_eq!(eval("String(12)"), s("12"));
    assert_eq!(eval("String(null)"), s("null"));
    assert_eq!(eval("String([1, [2, 3]])"), s("1,2,3"));
    assert_eq!(eval("String({})"), s("[object Object]"));
    assert_eq!(eval("String.fromCharCode(72, 105)"), s("Hi"));
}

#[test]
fn test_string_length_and_index() {
    assert_eq!(eval("'hello'.length"), num(5.0));
    assert_eq!(eval("'hello'[1]"), s("e"));
    assert_eq!(eval("'hello'.charAt(4)"), s("o"));
    assert_eq!(eval("'hello'.charAt(9)"), s(""));
    assert_eq!(eval("'A'.charCodeAt(0)"), num(65.0));
}

#[test]
fn test_string_search() {
    assert_eq!(eval("'banana'.indexOf('an')"), num(1.0));
    assert_eq!(eval("'banana'.lastIndexOf('an')"), num(3.0));
    assert_eq!(eval("'banana'.indexOf('x')"), num(-1.0));
    assert_eq!(eval("'banana'.includes('nan')"), Value::Bool(true));
    assert_eq!(eval("'banana'.startsWith('ban')"), Value::Bool(true));
    assert_eq!(eval("'banana'.endsWith('na')"), Value::Bool(true));
}

#[test]
fn test_string_slicing() {
    assert_eq!(eval("'formlogic'.slice(4)"), s("logic"));
    assert_eq!(eval("'formlogic'.slice(-5, -2)"), s("log"));
    assert_eq!(eval("'formlogic'.substring(4, 0)"), s("form"));
    assert_eq!(eval("'a,b,,c'.split(',')"), strings(&["a", "b", "", "c"]));
    assert_eq!(eval("'abc'.split('')"), strings(&["a", "b", "c"]));
    assert_eq!(eval("'a b c'.split(' ', 2)"), strings(&["a", "b"]));
}

#[test]
fn test_string_transforms() {
    assert_eq!(eval("'  pad  '.trim()"), s("pad"));
    assert_eq!(eval("'  pad  '.trimStart()"), s("pad  "));
    assert_eq!(eval("'  pad  '.trimEnd()"), s("  pad"));
    assert_eq!(eval("'MiXeD'.toUpperCase()"), s("MIXED"));
    assert_eq!(eval("'MiXeD'.toLowerCase()"), s("mixed"));
    assert_eq!(eval("'ab'.repeat(3)"), s("ababab"));
    assert_eq!(eval("'5'.padStart(3, '0')"), s("005"));
    assert_eq!(eval("'5'.padEnd(3, '-')"), s("5--"));
    assert_eq!(eval("'a'.concat('b', 1)"), s("ab1"));
}

#[test]
fn test_string_replace() {
    assert_eq!(eval("'a-b-c'.replace('-', '+')"), s("a+b-c"));
    assert_eq!(eval("'total'.replace('tot', '[$&]')"), s("[tot]al"));
    assert_eq!(eval("'x'.replace('y', 'z')"), s("x"));
}

#[test]
fn test_string_repeat_limits() {
    assert_eq!(runtime_error("'a'.repeat(-1)"), "RangeError: Invalid count value: -1");
    assert!(matches!(
        run_on(BuiltInRegistry::with_core(), "'abc'.repeat(10000000)"),
        Err(RunError::ResourceExceeded {
            resource: "string length",
            ..
        })
    ));
}

// ============================================================================
// Array
// ============================================================================

#[test]
fn test_array_basics() {
    assert_eq!(eval("Array.isArray([])"), Value::Bool(true));
    assert_eq!(eval("Array.isArray('no')"), Value::Bool(false));
    assert_eq!(eval("Array(3).length"), num(3.0));
    assert_eq!(eval("Array(1, 2)"), numbers(&[1.0, 2.0]));
    assert_eq!(runtime_error("Array(-1)"), "RangeError: Invalid array length");
}

#[test]
fn test_array_push_pop() {
    assert_eq!(eval("let a = [1]; a.push(2, 3)"), num(3.0));
    assert_eq!(eval("let a = [1, 2]; a.pop()"), num(2.0));
    assert_eq!(eval("let a = []; a.pop()"), Value::Null);
    assert_eq!(eval("let a = [1, 2]; a.pop(); a"), numbers(&[1.0]));
}

#[test]
fn test_array_search() {
    assert_eq!(eval("[1, 2, 3].indexOf(2)"), num(1.0));
    assert_eq!(eval("[1, 2, 3].indexOf('2')"), num(-1.0));
    assert_eq!(eval("[NaN].indexOf(NaN)"), num(-1.0));
    assert_eq!(eval("[NaN].includes(NaN)"), Value::Bool(true));
    assert_eq!(eval("[1, 2, 3].includes(4)"), Value::Bool(false));
}

#[test]
fn test_array_transforms() {
    assert_eq!(eval("[1, null, 'x'].join('-')"), s("1--x"));
    assert_eq!(eval("[1, 2].join()"), s("1,2"));
    assert_eq!(eval("[1, 2, 3, 4].slice(1, -1)"), numbers(&[2.0, 3.0]));
    assert_eq!(eval("[1].concat([2, 3], 4)"), numbers(&[1.0, 2.0, 3.0, 4.0]));
    assert_eq!(eval("[1, 2, 3].reverse()"), numbers(&[3.0, 2.0, 1.0]));
    assert_eq!(eval("[10, 9, 1].sort()"), numbers(&[1.0, 10.0, 9.0]));
    assert_eq!(eval("['b', undefined, 'a'].sort()"), Value::Array(vec![s("a"), s("b"), Value::Null]));
    assert_eq!(eval("[1, [2, 3]].toString()"), s("1,2,3"));
}

#[test]
fn test_array_join_with_cycle() {
    assert_eq!(eval("var a = [1]; a.push(a); a.join()"), s("1,"));
    assert_eq!(eval("var a = [1]; a.push(a); a.toString()"), s("1,"));
    assert_eq!(eval("var a = [1]; a.push([2, a]); a.join(' ')"), s("1 2,"));
}

#[test]
fn test_sort_rejects_comparator() {
    assert!(runtime_error("[2, 1].sort(1)").starts_with("TypeError"));
}

// ============================================================================
// Object
// ============================================================================

#[test]
fn test_object_static_methods() {
    assert_eq!(eval("Object.keys({ b: 1, a: 2 })"), strings(&["b", "a"]));
    assert_eq!(eval("Object.values({ b: 1, a: 2 })"), numbers(&[1.0, 2.0]));
    assert_eq!(
        eval("Object.entries({ k: 'v' })"),
        Value::Array(vec![strings(&["k", "v"])])
    );
    assert_eq!(eval("Object.keys([7, 8])"), strings(&["0", "1"]));
    assert_eq!(
        runtime_error("Object.keys(null)"),
        "TypeError: Cannot convert undefined or null to object"
    );
}

#[test]
fn test_has_own_property() {
    assert_eq!(eval("({ a: 1 }).hasOwnProperty('a')"), Value::Bool(true));
    assert_eq!(eval("({ a: 1 }).hasOwnProperty('b')"), Value::Bool(false));
    assert_eq!(eval("[5].hasOwnProperty('0')"), Value::Bool(true));
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_json_stringify() {
    assert_eq!(eval("JSON.stringify({ a: 1, b: [true, null, 'x'] })"), s(r#"{"a":1,"b":[true,null,"x"]}"#));
    assert_eq!(eval("JSON.stringify({ z: 1, a: 2 })"), s(r#"{"z":1,"a":2}"#));
    assert_eq!(eval("JSON.stringify(2.5)"), s("2.5"));
    assert_eq!(eval("JSON.stringify(1 / 0)"), s("null"));
    assert_eq!(eval("JSON.stringify({ u: undefined, f: Math.max })"), s("{}"));
    assert_eq!(eval("JSON.stringify([undefined])"), s("[null]"));
    assert_eq!(eval("JSON.stringify(undefined)"), Value::Null);
    assert_eq!(eval("JSON.stringify([1], null, 2)"), s("[\n  1\n]"));
}

#[test]
fn test_json_stringify_cycle() {
    assert_eq!(
        runtime_error("let o = {}; o.self = o; JSON.stringify(o)"),
        "TypeError: Converting circular structure to JSON"
    );
}

#[test]
fn test_json_parse() {
    assert_eq!(eval("JSON.parse('{\"n\": 2}').n + 1"), num(3.0));
    assert_eq!(eval("JSON.parse('[1, \"a\"]')[1]"), s("a"));
    assert!(runtime_error("JSON.parse('{bad')").starts_with("SyntaxError: JSON.parse"));
    assert_eq!(
        eval("try { JSON.parse('') } catch (e) { e.name }"),
        s("SyntaxError")
    );
}

// ============================================================================
// Errors and host objects
// ============================================================================

#[test]
fn test_error_factories() {
    assert_eq!(eval("Error('m').message"), s("m"));
    assert_eq!(eval("TypeError('t').name"), s("TypeError"));
    assert_eq!(eval("RangeError().message"), s(""));
    assert_eq!(runtime_error("throw SyntaxError('bad rule')"), "SyntaxError: bad rule");
}

#[test]
fn test_host_registered_object() {
    let mut registry = BuiltInRegistry::with_core();
    registry.register_object(
        BuiltInObject::new("Tax")
            .add_property("RATE", JsValue::Number(0.25))
            .add_host_method("apply", |ctx, _this, args| {
                let amount = match args.first() {
                    Some(v) => ctx.to_number(v)?,
                    None => 0.0,
                };
                Ok(JsValue::Number(amount * 2.0))
            }),
    );
    assert_eq!(run_on(registry, "Tax.apply(100) + Tax.RATE"), Ok(num(200.25)));
}
