//! Math built-in object.
//!
//! Provides mathematical constants and functions. There is deliberately no
//! `Math.random`: the same script with the same bindings always yields the
//! same value.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::expression::exponentiate;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::number_arg;

/// Register the Math object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let math = BuiltInObject::new("Math")
        // Constants
        .add_property("E", JsValue::Number(std::f64::consts::E))
        .add_property("LN10", JsValue::Number(std::f64::consts::LN_10))
        .add_property("LN2", JsValue::Number(std::f64::consts::LN_2))
        .add_property("LOG10E", JsValue::Number(std::f64::consts::LOG10_E))
        .add_property("LOG2E", JsValue::Number(std::f64::consts::LOG2_E))
        .add_property("PI", JsValue::Number(std::f64::consts::PI))
        .add_property("SQRT1_2", JsValue::Number(std::f64::consts::FRAC_1_SQRT_2))
        .add_property("SQRT2", JsValue::Number(std::f64::consts::SQRT_2))
        // Methods
        .add_method("abs", math_abs)
        .add_method("floor", math_floor)
        .add_method("ceil", math_ceil)
        .add_method("round", math_round)
        .add_method("trunc", math_trunc)
        .add_method("sign", math_sign)
        .add_method("min", math_min)
        .add_method("max", math_max)
        .add_method("sqrt", math_sqrt)
        .add_method("cbrt", math_cbrt)
        .add_method("pow", math_pow)
        .add_method("exp", math_exp)
        .add_method("log", math_log)
        .add_method("log10", math_log10)
        .add_method("log2", math_log2)
        .add_method("sin", math_sin)
        .add_method("cos", math_cos)
        .add_method("tan", math_tan)
        .add_method("atan", math_atan)
        .add_method("atan2", math_atan2)
        .add_method("hypot", math_hypot);

    registry.register_object(math);
}

/// Apply `f` to the first argument as a number.
fn unary(ctx: &EvalContext, args: &[JsValue], f: fn(f64) -> f64) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Number(f(number_arg(ctx, args, 0, f64::NAN)?)))
}

/// Math.abs
fn math_abs(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::abs)
}

/// Math.floor
fn math_floor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::floor)
}

/// Math.ceil
fn math_ceil(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::ceil)
}

/// Math.round: halves round toward +Infinity.
fn math_round(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, |x| {
        if !x.is_finite() {
            return x;
        }
        let floor = x.floor();
        if x - floor >= 0.5 {
            floor + 1.0
        } else {
            floor
        }
    })
}

/// Math.trunc
fn math_trunc(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::trunc)
}

/// Math.sign
fn math_sign(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, |x| {
        if x.is_nan() || x == 0.0 {
            x
        } else if x > 0.0 {
            1.0
        } else {
            -1.0
        }
    })
}

/// Math.min
fn math_min(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut result = f64::INFINITY;
    for arg in &args {
        let x = ctx.to_number(arg)?;
        if x.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        result = result.min(x);
    }
    Ok(JsValue::Number(result))
}

/// Math.max
fn math_max(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut result = f64::NEG_INFINITY;
    for arg in &args {
        let x = ctx.to_number(arg)?;
        if x.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        result = result.max(x);
    }
    Ok(JsValue::Number(result))
}

/// Math.sqrt
fn math_sqrt(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::sqrt)
}

/// Math.cbrt
fn math_cbrt(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::cbrt)
}

/// Math.pow
fn math_pow(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let base = number_arg(ctx, &args, 0, f64::NAN)?;
    let exponent = number_arg(ctx, &args, 1, f64::NAN)?;
    Ok(JsValue::Number(exponentiate(base, exponent)))
}

/// Math.exp
fn math_exp(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::exp)
}

/// Math.log
fn math_log(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::ln)
}

/// Math.log10
fn math_log10(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::log10)
}

/// Math.log2
fn math_log2(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::log2)
}

/// Math.sin
fn math_sin(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::sin)
}

/// Math.cos
fn math_cos(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::cos)
}

/// Math.tan
fn math_tan(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::tan)
}

/// Math.atan
fn math_atan(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::atan)
}

/// Math.atan2
fn math_atan2(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let y = number_arg(ctx, &args, 0, f64::NAN)?;
    let x = number_arg(ctx, &args, 1, f64::NAN)?;
    Ok(JsValue::Number(y.atan2(x)))
}

/// Math.hypot
fn math_hypot(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut sum = 0.0;
    let mut saw_nan = false;
    for arg in &args {
        let x = ctx.to_number(arg)?;
        if x.is_infinite() {
            return Ok(JsValue::Number(f64::INFINITY));
        }
        saw_nan |= x.is_nan();
        sum += x * x;
    }
    Ok(JsValue::Number(if saw_nan { f64::NAN } else { sum.sqrt() }))
}
