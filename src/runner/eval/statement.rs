//! Statement execution.

use crate::parser::ast::{
    BlockStatementData, CatchClauseData, ForInit, ForIteratorData, ForIteratorLeft, Script,
    StatementType, SwitchCaseData, VariableDeclarationData, VariableDeclarationKind,
};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::HeapCell;
use crate::runner::ds::operations::object::own_keys;
use crate::runner::ds::operations::test_and_comparison::strict_equality;
use crate::runner::ds::operations::type_conversion::to_boolean;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

use super::expression::{evaluate_expression, put_value, resolve_pattern};
use super::types::{Completion, CompletionType, EvalResult};

/// Run a parsed script inside its own lexical scope.
pub fn execute_script(script: &Script, ctx: &mut EvalContext) -> EvalResult {
    in_new_scope(ctx, |ctx| {
        declare_lexical_bindings(&script.statements, ctx);
        execute_statements(&script.statements, ctx)
    })
}

/// Declare every `var` in the script up front, as `undefined`.
pub fn hoist_var_declarations(statements: &[StatementType], ctx: &mut EvalContext) {
    for statement in statements {
        hoist_from_statement(statement, ctx);
    }
}

fn hoist_from_statement(statement: &StatementType, ctx: &mut EvalContext) {
    match statement {
        StatementType::VariableDeclaration(data) => hoist_from_declaration(data, ctx),
        StatementType::BlockStatement(data) => hoist_var_declarations(&data.body, ctx),
        StatementType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            hoist_from_statement(consequent, ctx);
            if let Some(alternate) = alternate {
                hoist_from_statement(alternate, ctx);
            }
        }
        StatementType::WhileStatement { body, .. }
        | StatementType::DoWhileStatement { body, .. } => hoist_from_statement(body, ctx),
        StatementType::ForStatement { init, body, .. } => {
            if let Some(ForInit::VariableDeclaration(data)) = init {
                hoist_from_declaration(data, ctx);
            }
            hoist_from_statement(body, ctx);
        }
        StatementType::ForInStatement(data) | StatementType::ForOfStatement(data) => {
            if let ForIteratorLeft::Binding {
                kind: VariableDeclarationKind::Var,
                id,
            } = &data.left
            {
                ctx.scopes.declare_var(&id.name);
            }
            hoist_from_statement(&data.body, ctx);
        }
        StatementType::SwitchStatement { cases, .. } => {
            for case in cases {
                hoist_var_declarations(&case.consequent, ctx);
            }
        }
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            hoist_var_declarations(&block.body, ctx);
            if let Some(handler) = handler {
                hoist_var_declarations(&handler.body.body, ctx);
            }
            if let Some(finalizer) = finalizer {
                hoist_var_declarations(&finalizer.body, ctx);
            }
        }
        _ => {}
    }
}

fn hoist_from_declaration(data: &VariableDeclarationData, ctx: &mut EvalContext) {
    if data.kind == VariableDeclarationKind::Var {
        for declarator in &data.declarations {
            ctx.scopes.declare_var(&declarator.id.name);
        }
    }
}

/// Create the block's `let`/`const` bindings before any of its statements
/// run, so reads ahead of the declaration fail instead of seeing outer names.
fn declare_lexical_bindings(statements: &[StatementType], ctx: &mut EvalContext) {
    for statement in statements {
        if let StatementType::VariableDeclaration(data) = statement {
            declare_lexical_declaration(data, ctx);
        }
    }
}

fn declare_lexical_declaration(data: &VariableDeclarationData, ctx: &mut EvalContext) {
    if data.kind != VariableDeclarationKind::Var {
        for declarator in &data.declarations {
            ctx.scopes
                .declare_lexical(&declarator.id.name, data.kind == VariableDeclarationKind::Let);
        }
    }
}

fn in_new_scope<F>(ctx: &mut EvalContext, f: F) -> EvalResult
where
    F: FnOnce(&mut EvalContext) -> EvalResult,
{
    ctx.scopes.push_scope();
    let result = f(ctx);
    ctx.scopes.pop_scope();
    result
}

fn execute_statements(statements: &[StatementType], ctx: &mut EvalContext) -> EvalResult {
    for statement in statements {
        let completion = execute_statement(statement, ctx)?;
        if completion.is_abrupt() {
            return Ok(completion);
        }
    }
    Ok(Completion::normal())
}

fn execute_block(block: &BlockStatementData, ctx: &mut EvalContext) -> EvalResult {
    in_new_scope(ctx, |ctx| {
        declare_lexical_bindings(&block.body, ctx);
        execute_statements(&block.body, ctx)
    })
}

/// Execute a statement and return its completion.
pub fn execute_statement(statement: &StatementType, ctx: &mut EvalContext) -> EvalResult {
    ctx.check_interrupt()?;
    match statement {
        StatementType::EmptyStatement { .. } => Ok(Completion::normal()),

        StatementType::ExpressionStatement { expression, .. } => {
            let value = evaluate_expression(expression, ctx)?;
            ctx.completion_value = value;
            Ok(Completion::normal())
        }

        StatementType::BlockStatement(block) => execute_block(block, ctx),

        StatementType::VariableDeclaration(data) => {
            execute_variable_declaration(data, ctx)?;
            Ok(Completion::normal())
        }

        StatementType::IfStatement {
            test,
            consequent,
            alternate,
            ..
        } => {
            let test_val = evaluate_expression(test, ctx)?;
            if to_boolean(&test_val) {
                execute_statement(consequent, ctx)
            } else if let Some(alternate) = alternate {
                execute_statement(alternate, ctx)
            } else {
                Ok(Completion::normal())
            }
        }

        StatementType::WhileStatement { test, body, .. } => loop {
            ctx.check_interrupt()?;
            let test_val = evaluate_expression(test, ctx)?;
            if !to_boolean(&test_val) {
                return Ok(Completion::normal());
            }
            if let Some(exit) = loop_exit(execute_statement(body, ctx)?) {
                return Ok(exit);
            }
        },

        StatementType::DoWhileStatement { body, test, .. } => loop {
            ctx.check_interrupt()?;
            if let Some(exit) = loop_exit(execute_statement(body, ctx)?) {
                return Ok(exit);
            }
            let test_val = evaluate_expression(test, ctx)?;
            if !to_boolean(&test_val) {
                return Ok(Completion::normal());
            }
        },

        StatementType::ForStatement {
            init,
            test,
            update,
            body,
            ..
        } => in_new_scope(ctx, |ctx| {
            match init {
                Some(ForInit::VariableDeclaration(data)) => {
                    declare_lexical_declaration(data, ctx);
                    execute_variable_declaration(data, ctx)?;
                }
                Some(ForInit::Expression(expr)) => {
                    evaluate_expression(expr, ctx)?;
                }
                None => {}
            }
            loop {
                ctx.check_interrupt()?;
                if let Some(test) = test {
                    let test_val = evaluate_expression(test, ctx)?;
                    if !to_boolean(&test_val) {
                        return Ok(Completion::normal());
                    }
                }
                if let Some(exit) = loop_exit(execute_statement(body, ctx)?) {
                    return Ok(exit);
                }
                if let Some(update) = update {
                    evaluate_expression(update, ctx)?;
                }
            }
        }),

        StatementType::ForInStatement(data) => {
            let target = evaluate_expression(&data.right, ctx)?;
            let keys = own_keys(ctx, &target);
            for key in keys {
                ctx.check_interrupt()?;
                let completion = run_iteration(data, JsValue::String(key), ctx)?;
                if let Some(exit) = loop_exit(completion) {
                    return Ok(exit);
                }
            }
            Ok(Completion::normal())
        }

        StatementType::ForOfStatement(data) => execute_for_of(data, ctx),

        StatementType::SwitchStatement {
            discriminant,
            cases,
            ..
        } => {
            let value = evaluate_expression(discriminant, ctx)?;
            in_new_scope(ctx, |ctx| execute_switch_cases(&value, cases, ctx))
        }

        StatementType::BreakStatement { .. } => Ok(Completion::break_completion()),

        StatementType::ContinueStatement { .. } => Ok(Completion::continue_completion()),

        StatementType::ReturnStatement { argument, .. } => {
            let value = match argument {
                Some(argument) => evaluate_expression(argument, ctx)?,
                None => JsValue::Undefined,
            };
            Ok(Completion::return_value(value))
        }

        StatementType::ThrowStatement { argument, .. } => {
            let value = evaluate_expression(argument, ctx)?;
            Err(JErrorType::Thrown(value))
        }

        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => execute_try(block, handler.as_ref(), finalizer.as_ref(), ctx),
    }
}

/// `Some` when the loop must stop with this completion.
fn loop_exit(completion: Completion) -> Option<Completion> {
    match completion.completion_type {
        CompletionType::Normal | CompletionType::Continue => None,
        CompletionType::Break => Some(Completion::normal()),
        CompletionType::Return => Some(completion),
    }
}

fn execute_variable_declaration(
    data: &VariableDeclarationData,
    ctx: &mut EvalContext,
) -> Result<(), JErrorType> {
    for declarator in &data.declarations {
        let name = &declarator.id.name;
        match data.kind {
            VariableDeclarationKind::Var => {
                if let Some(init) = &declarator.init {
                    let value = evaluate_expression(init, ctx)?;
                    ctx.set_binding(name, value)?;
                }
            }
            kind => {
                let value = match &declarator.init {
                    Some(init) => evaluate_expression(init, ctx)?,
                    None => JsValue::Undefined,
                };
                ctx.scopes
                    .declare_lexical(name, kind == VariableDeclarationKind::Let);
                ctx.scopes.initialize_lexical(name, value);
            }
        }
    }
    Ok(())
}

/// Bind the loop variable of a `for...in`/`for...of` and run the body once.
fn run_iteration(data: &ForIteratorData, value: JsValue, ctx: &mut EvalContext) -> EvalResult {
    in_new_scope(ctx, |ctx| {
        match &data.left {
            ForIteratorLeft::Binding {
                kind: VariableDeclarationKind::Var,
                id,
            } => ctx.set_binding(&id.name, value)?,
            ForIteratorLeft::Binding { kind, id } => {
                ctx.scopes
                    .declare_lexical(&id.name, *kind == VariableDeclarationKind::Let);
                ctx.scopes.initialize_lexical(&id.name, value);
            }
            ForIteratorLeft::Pattern(pattern) => {
                let reference = resolve_pattern(pattern, ctx)?;
                put_value(reference, value, ctx)?;
            }
        }
        execute_statement(&data.body, ctx)
    })
}

fn execute_for_of(data: &ForIteratorData, ctx: &mut EvalContext) -> EvalResult {
    let iterable = evaluate_expression(&data.right, ctx)?;
    match &iterable {
        JsValue::String(s) => {
            for c in s.chars() {
                ctx.check_interrupt()?;
                let completion = run_iteration(data, JsValue::String(c.to_string()), ctx)?;
                if let Some(exit) = loop_exit(completion) {
                    return Ok(exit);
                }
            }
            Ok(Completion::normal())
        }
        JsValue::Object(r) if ctx.heap.is_array(*r) => {
            let r = *r;
            let mut index = 0;
            // The array is read live, so pushes made by the body are visited.
            loop {
                ctx.check_interrupt()?;
                let element = match ctx.heap.get(r) {
                    HeapCell::Array(elements) => elements.get(index).cloned(),
                    HeapCell::Object(_) => None,
                };
                let Some(element) = element else {
                    return Ok(Completion::normal());
                };
                let completion = run_iteration(data, element, ctx)?;
                if let Some(exit) = loop_exit(completion) {
                    return Ok(exit);
                }
                index += 1;
            }
        }
        other => Err(JErrorType::TypeError(format!(
            "{} is not iterable",
            ctx.to_js_string(other)?
        ))),
    }
}

fn execute_switch_cases(
    value: &JsValue,
    cases: &[SwitchCaseData],
    ctx: &mut EvalContext,
) -> EvalResult {
    for case in cases {
        declare_lexical_bindings(&case.consequent, ctx);
    }

    let mut start = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            let candidate = evaluate_expression(test, ctx)?;
            if strict_equality(value, &candidate) {
                start = Some(i);
                break;
            }
        }
    }
    let start = match start.or_else(|| cases.iter().position(|c| c.test.is_none())) {
        Some(start) => start,
        None => return Ok(Completion::normal()),
    };

    for case in &cases[start..] {
        let completion = execute_statements(&case.consequent, ctx)?;
        match completion.completion_type {
            CompletionType::Normal => {}
            CompletionType::Break => return Ok(Completion::normal()),
            CompletionType::Continue | CompletionType::Return => return Ok(completion),
        }
    }
    Ok(Completion::normal())
}

fn execute_try(
    block: &BlockStatementData,
    handler: Option<&CatchClauseData>,
    finalizer: Option<&BlockStatementData>,
    ctx: &mut EvalContext,
) -> EvalResult {
    let mut result = execute_block(block, ctx);

    if let Some(handler) = handler {
        if let Err(error) = result {
            result = if error.is_catchable() {
                let caught = error_to_value(error, ctx)?;
                in_new_scope(ctx, |ctx| {
                    if let Some(param) = &handler.param {
                        ctx.scopes.declare_lexical(&param.name, true);
                        ctx.scopes.initialize_lexical(&param.name, caught);
                    }
                    execute_block(&handler.body, ctx)
                })
            } else {
                Err(error)
            };
        }
    }

    // Timeouts and resource ceilings skip `finally` and unwind straight out.
    if let Err(error) = &result {
        if !error.is_catchable() {
            return result;
        }
    }
    if let Some(finalizer) = finalizer {
        let completion = execute_block(finalizer, ctx)?;
        if completion.is_abrupt() {
            return Ok(completion);
        }
    }
    result
}

/// The value a `catch` clause binds for an error.
fn error_to_value(error: JErrorType, ctx: &mut EvalContext) -> Result<JsValue, JErrorType> {
    match error {
        JErrorType::Thrown(value) => Ok(value),
        other => match other.name_and_message() {
            Some((name, message)) => ctx.new_error_object(name, message),
            None => Err(other),
        },
    }
}
