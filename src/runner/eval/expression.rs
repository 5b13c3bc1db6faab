//! Expression evaluation.
//!
//! Every expression node counts as one interpreter step, so long-running
//! expressions observe cancellation as promptly as loops do.

use std::cmp::Ordering;

use crate::parser::ast::{
    Accessor, AssignmentOperator, BinaryOperator, ExpressionType, HasMeta, LiteralData, LiteralType,
    LogicalOperator, PatternType, PropertyData, PropertyKey, UnaryOperator, UpdateOperator,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectData;
use crate::runner::ds::operations::object::{get_property, has_property, set_property};
use crate::runner::ds::operations::test_and_comparison::{
    compare_values, loose_equality, strict_equality,
};
use crate::runner::ds::operations::type_conversion::{to_boolean, to_primitive, to_property_key};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

use super::types::{Reference, ReferenceBase, ReferenceResult, ValueResult};

/// Evaluate an expression and return its value.
pub fn evaluate_expression(expr: &ExpressionType, ctx: &mut EvalContext) -> ValueResult {
    ctx.check_interrupt()?;
    match expr {
        ExpressionType::Literal(lit) => Ok(evaluate_literal(lit)),

        ExpressionType::Identifier(id) => ctx.get_binding(&id.name),

        ExpressionType::ArrayExpression { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(evaluate_expression(element, ctx)?);
            }
            ctx.new_array(values)
        }

        ExpressionType::ObjectExpression { properties, .. } => {
            evaluate_object_expression(properties, ctx)
        }

        ExpressionType::MemberExpression {
            object, accessors, ..
        } => evaluate_member_chain(object, accessors, ctx),

        ExpressionType::UnaryExpression {
            operators,
            argument,
            ..
        } => evaluate_unary_expression(operators, argument, ctx),

        ExpressionType::UpdateExpression {
            operator,
            argument,
            prefix,
            ..
        } => evaluate_update_expression(*operator, argument, *prefix, ctx),

        ExpressionType::BinaryExpression { first, rest, .. } => {
            let mut result = evaluate_expression(first, ctx)?;
            for (operator, operand) in rest {
                let right = evaluate_expression(operand, ctx)?;
                result = apply_binary_operator(*operator, &result, &right, ctx)?;
            }
            Ok(result)
        }

        ExpressionType::ExponentExpression { operands, .. } => {
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                let value = evaluate_expression(operand, ctx)?;
                values.push(ctx.to_number(&value)?);
            }
            let mut iter = values.into_iter().rev();
            let mut result = iter.next().unwrap_or(f64::NAN);
            for base in iter {
                result = exponentiate(base, result);
            }
            Ok(JsValue::Number(result))
        }

        ExpressionType::LogicalExpression {
            operator, operands, ..
        } => evaluate_logical_expression(*operator, operands, ctx),

        ExpressionType::ConditionalExpression {
            branches,
            alternate,
            ..
        } => {
            for (test, consequent) in branches {
                let test_val = evaluate_expression(test, ctx)?;
                if to_boolean(&test_val) {
                    return evaluate_expression(consequent, ctx);
                }
            }
            evaluate_expression(alternate, ctx)
        }

        ExpressionType::AssignmentExpression { targets, value, .. } => {
            let mut value = evaluate_expression(value, ctx)?;
            for (target, operator) in targets.iter().rev() {
                value = evaluate_assignment(target, *operator, value, ctx)?;
            }
            Ok(value)
        }

        ExpressionType::SequenceExpression { expressions, .. } => {
            let mut result = JsValue::Undefined;
            for expr in expressions {
                result = evaluate_expression(expr, ctx)?;
            }
            Ok(result)
        }
    }
}

/// Evaluate a literal and return its value.
fn evaluate_literal(lit: &LiteralData) -> JsValue {
    match &lit.value {
        LiteralType::NullLiteral => JsValue::Null,
        LiteralType::UndefinedLiteral => JsValue::Undefined,
        LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
        LiteralType::NumberLiteral(n) => JsValue::Number(*n),
        LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
    }
}

fn evaluate_object_expression(properties: &[PropertyData], ctx: &mut EvalContext) -> ValueResult {
    let mut data = ObjectData::new();
    for property in properties {
        let value = evaluate_expression(&property.value, ctx)?;
        data.insert(property.key.clone(), value);
    }
    ctx.new_object(data)
}

// ============================================================================
// Member access and calls
// ============================================================================

fn evaluate_property_key(key: &PropertyKey, ctx: &mut EvalContext) -> Result<String, JErrorType> {
    match key {
        PropertyKey::Static(name) => Ok(name.clone()),
        PropertyKey::Computed(expr) => {
            let value = evaluate_expression(expr, ctx)?;
            to_property_key(&value, &ctx.heap)
        }
    }
}

/// Walk `object` followed by its accessors. A call receives the value the
/// preceding member access was read from as `this`.
fn evaluate_member_chain(
    object: &ExpressionType,
    accessors: &[Accessor],
    ctx: &mut EvalContext,
) -> ValueResult {
    let mut value = evaluate_expression(object, ctx)?;
    let mut this = JsValue::Undefined;
    for (i, accessor) in accessors.iter().enumerate() {
        match accessor {
            Accessor::Member(key) => {
                let key = evaluate_property_key(key, ctx)?;
                let next = get_property(ctx, &value, &key)?;
                this = std::mem::replace(&mut value, next);
            }
            Accessor::Call(arguments) => {
                if !ctx.is_callable(&value) {
                    return Err(JErrorType::TypeError(format!(
                        "{} is not a function",
                        describe_chain(ctx, object, &accessors[..i])
                    )));
                }
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(evaluate_expression(argument, ctx)?);
                }
                let callee = std::mem::replace(&mut value, JsValue::Undefined);
                let receiver = std::mem::replace(&mut this, JsValue::Undefined);
                value = ctx.call_function(&callee, receiver, args)?;
            }
        }
    }
    Ok(value)
}

/// Source-like rendering of a member chain for error messages.
fn describe_chain(ctx: &EvalContext, object: &ExpressionType, accessors: &[Accessor]) -> String {
    let mut text = match object {
        ExpressionType::Identifier(id) => id.name.clone(),
        ExpressionType::Literal(lit) => match &lit.value {
            LiteralType::StringLiteral(s) => format!("\"{}\"", s),
            LiteralType::NumberLiteral(n) => JsValue::Number(*n).to_string(),
            LiteralType::BooleanLiteral(b) => b.to_string(),
            LiteralType::NullLiteral => "null".to_string(),
            LiteralType::UndefinedLiteral => "undefined".to_string(),
        },
        ExpressionType::ArrayExpression { meta, .. } => {
            ctx.source_text(meta).unwrap_or("[...]").to_string()
        }
        other => format!("({})", ctx.source_text(other.get_meta()).unwrap_or("...")),
    };
    for accessor in accessors {
        match accessor {
            Accessor::Member(PropertyKey::Static(name)) => {
                text.push('.');
                text.push_str(name);
            }
            Accessor::Member(PropertyKey::Computed(_)) => text.push_str("[...]"),
            Accessor::Call(_) => text.push_str("(...)"),
        }
    }
    text
}

// ============================================================================
// Assignment
// ============================================================================

pub fn resolve_pattern(pattern: &PatternType, ctx: &mut EvalContext) -> ReferenceResult {
    match pattern {
        PatternType::Identifier(id) => Ok(Reference::environment(id.name.clone())),
        PatternType::Member {
            object,
            accessors,
            property,
            ..
        } => {
            let base = evaluate_member_chain(object, accessors, ctx)?;
            let key = evaluate_property_key(property, ctx)?;
            Ok(Reference::property(base, key))
        }
    }
}

pub fn get_value(reference: &Reference, ctx: &EvalContext) -> ValueResult {
    match &reference.base {
        ReferenceBase::Environment => ctx.get_binding(&reference.referenced_name),
        ReferenceBase::Object(base) => get_property(ctx, base, &reference.referenced_name),
    }
}

pub fn put_value(reference: Reference, value: JsValue, ctx: &mut EvalContext) -> Result<(), JErrorType> {
    match reference.base {
        ReferenceBase::Environment => ctx.set_binding(&reference.referenced_name, value),
        ReferenceBase::Object(base) => {
            set_property(ctx, &base, reference.referenced_name, value)
        }
    }
}

fn evaluate_assignment(
    target: &PatternType,
    operator: AssignmentOperator,
    value: JsValue,
    ctx: &mut EvalContext,
) -> ValueResult {
    let reference = resolve_pattern(target, ctx)?;
    let binary = match operator {
        AssignmentOperator::Equals => None,
        AssignmentOperator::AddEquals => Some(BinaryOperator::Add),
        AssignmentOperator::SubtractEquals => Some(BinaryOperator::Subtract),
        AssignmentOperator::MultiplyEquals => Some(BinaryOperator::Multiply),
        AssignmentOperator::DivideEquals => Some(BinaryOperator::Divide),
        AssignmentOperator::ModuloEquals => Some(BinaryOperator::Modulo),
        AssignmentOperator::ExponentEquals => None,
    };
    let final_value = if operator == AssignmentOperator::Equals {
        value
    } else {
        let current = get_value(&reference, ctx)?;
        match binary {
            Some(binary) => apply_binary_operator(binary, &current, &value, ctx)?,
            None => JsValue::Number(exponentiate(
                ctx.to_number(&current)?,
                ctx.to_number(&value)?,
            )),
        }
    };
    put_value(reference, final_value.clone(), ctx)?;
    Ok(final_value)
}

fn evaluate_update_expression(
    operator: UpdateOperator,
    argument: &PatternType,
    prefix: bool,
    ctx: &mut EvalContext,
) -> ValueResult {
    let reference = resolve_pattern(argument, ctx)?;
    let current = get_value(&reference, ctx)?;
    let old = ctx.to_number(&current)?;
    let new = match operator {
        UpdateOperator::PlusPlus => old + 1.0,
        UpdateOperator::MinusMinus => old - 1.0,
    };
    put_value(reference, JsValue::Number(new), ctx)?;
    Ok(JsValue::Number(if prefix { new } else { old }))
}

// ============================================================================
// Operators
// ============================================================================

/// Apply prefix operators, innermost first.
fn evaluate_unary_expression(
    operators: &[UnaryOperator],
    argument: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    let mut pending = operators.iter().rev().peekable();
    // `typeof x` does not throw for an undeclared `x`.
    let mut value = match (pending.peek(), argument) {
        (Some(UnaryOperator::TypeOf), ExpressionType::Identifier(id))
            if !ctx.has_binding(&id.name) =>
        {
            pending.next();
            JsValue::String("undefined".to_string())
        }
        _ => evaluate_expression(argument, ctx)?,
    };
    for operator in pending {
        value = match operator {
            UnaryOperator::TypeOf => JsValue::String(ctx.type_of(&value).to_string()),
            UnaryOperator::Void => JsValue::Undefined,
            UnaryOperator::LogicalNot => JsValue::Boolean(!to_boolean(&value)),
            UnaryOperator::Minus => JsValue::Number(-ctx.to_number(&value)?),
            UnaryOperator::Plus => JsValue::Number(ctx.to_number(&value)?),
        };
    }
    Ok(value)
}

pub fn apply_binary_operator(
    operator: BinaryOperator,
    left: &JsValue,
    right: &JsValue,
    ctx: &mut EvalContext,
) -> ValueResult {
    match operator {
        BinaryOperator::Add => add_values(left, right, ctx),
        BinaryOperator::Subtract => {
            Ok(JsValue::Number(ctx.to_number(left)? - ctx.to_number(right)?))
        }
        BinaryOperator::Multiply => {
            Ok(JsValue::Number(ctx.to_number(left)? * ctx.to_number(right)?))
        }
        BinaryOperator::Divide => {
            Ok(JsValue::Number(ctx.to_number(left)? / ctx.to_number(right)?))
        }
        BinaryOperator::Modulo => {
            Ok(JsValue::Number(ctx.to_number(left)? % ctx.to_number(right)?))
        }

        BinaryOperator::LessThan => {
            let ord = compare_values(left, right, &ctx.heap)?;
            Ok(JsValue::Boolean(ord == Some(Ordering::Less)))
        }
        BinaryOperator::GreaterThan => {
            let ord = compare_values(left, right, &ctx.heap)?;
            Ok(JsValue::Boolean(ord == Some(Ordering::Greater)))
        }
        BinaryOperator::LessThanEqual => {
            let ord = compare_values(left, right, &ctx.heap)?;
            Ok(JsValue::Boolean(matches!(
                ord,
                Some(Ordering::Less | Ordering::Equal)
            )))
        }
        BinaryOperator::GreaterThanEqual => {
            let ord = compare_values(left, right, &ctx.heap)?;
            Ok(JsValue::Boolean(matches!(
                ord,
                Some(Ordering::Greater | Ordering::Equal)
            )))
        }

        BinaryOperator::StrictlyEqual => Ok(JsValue::Boolean(strict_equality(left, right))),
        BinaryOperator::StrictlyUnequal => Ok(JsValue::Boolean(!strict_equality(left, right))),
        BinaryOperator::LooselyEqual => {
            Ok(JsValue::Boolean(loose_equality(left, right, &ctx.heap)?))
        }
        BinaryOperator::LooselyUnequal => {
            Ok(JsValue::Boolean(!loose_equality(left, right, &ctx.heap)?))
        }

        BinaryOperator::In => {
            let key = to_property_key(left, &ctx.heap)?;
            Ok(JsValue::Boolean(has_property(ctx, &key, right)?))
        }
    }
}

/// `+`: string concatenation if either side is a string after conversion to
/// a primitive, numeric addition otherwise.
fn add_values(left: &JsValue, right: &JsValue, ctx: &mut EvalContext) -> ValueResult {
    let left = to_primitive(left, &ctx.heap)?;
    let right = to_primitive(right, &ctx.heap)?;
    match (&left, &right) {
        (JsValue::String(_), _) | (_, JsValue::String(_)) => {
            let mut joined = ctx.to_js_string(&left)?;
            joined.push_str(&ctx.to_js_string(&right)?);
            ctx.new_string(joined)
        }
        _ => Ok(JsValue::Number(ctx.to_number(&left)? + ctx.to_number(&right)?)),
    }
}

/// `**` with the JavaScript special cases that differ from `powf`.
pub fn exponentiate(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

fn evaluate_logical_expression(
    operator: LogicalOperator,
    operands: &[ExpressionType],
    ctx: &mut EvalContext,
) -> ValueResult {
    let mut value = JsValue::Undefined;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            let settled = match operator {
                LogicalOperator::And => !to_boolean(&value),
                LogicalOperator::Or => to_boolean(&value),
                LogicalOperator::NullishCoalescing => !value.is_nullish(),
            };
            if settled {
                return Ok(value);
            }
        }
        value = evaluate_expression(operand, ctx)?;
    }
    Ok(value)
}
