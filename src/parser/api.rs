use pest::error::{Error, ErrorVariant, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest::Span;
use pest_derive::Parser;

use super::ast::*;
use super::static_semantics::{check_nesting_depth, validate_script};
use super::ParseError;
use crate::runner::ds::operations::type_conversion::number_to_string;

#[derive(Parser)]
#[grammar = "parser/script_grammar.pest"] // relative to src
pub struct ScriptParser;

/// Parse `script` into an AST, rejecting anything nested deeper than
/// `max_nesting_depth` before the grammar ever sees it.
pub fn parse_script(script: &str, max_nesting_depth: usize) -> Result<Script, ParseError> {
    check_nesting_depth(script, max_nesting_depth)?;
    let ast = parse_to_ast(script).map_err(from_pest_error)?;
    validate_script(&ast, script)?;
    Ok(ast)
}

pub fn parse_to_ast(script: &str) -> Result<Script, Error<Rule>> {
    let pairs = ScriptParser::parse(Rule::script, script)?;
    let mut statements = vec![];
    for pair in pairs {
        if pair.as_rule() != Rule::script {
            return Err(get_unexpected_error(1, &pair));
        }
        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::statement => statements.push(build_ast_from_statement(inner_pair)?),
                Rule::EOI => { /* Do nothing */ }
                _ => return Err(get_unexpected_error(2, &inner_pair)),
            }
        }
    }
    Ok(Script { statements })
}

fn from_pest_error(error: Error<Rule>) -> ParseError {
    let (line, column) = match error.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    let message = match &error.variant {
        ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
            let expected: Vec<String> = positives.iter().map(describe_rule).collect();
            format!("Unexpected token, expected {}", expected.join(" or "))
        }
        ErrorVariant::ParsingError { .. } => "Unexpected token".to_string(),
        ErrorVariant::CustomError { message } => message.clone(),
    };
    ParseError {
        message,
        line,
        column,
    }
}

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of script".to_string(),
        Rule::kw_while => "'while'".to_string(),
        Rule::kw_in | Rule::kw_of => "'in' or 'of'".to_string(),
        Rule::question_mark => "'?'".to_string(),
        other => format!("{:?}", other).replace('_', " "),
    }
}

fn get_unexpected_error(id: i32, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_semantic_error(message: &str, pair: &Pair<Rule>) -> Error<Rule> {
    Error::new_from_span(
        ErrorVariant::CustomError {
            message: message.to_string(),
        },
        pair.as_span(),
    )
}

fn get_span_error(id: i32, span: &Span) -> Error<Rule> {
    let message = format!("Unexpected end of node - {}", id);
    Error::new_from_span(ErrorVariant::CustomError { message }, span.clone())
}

fn next_pair<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    span: &Span<'i>,
    id: i32,
) -> Result<Pair<'i, Rule>, Error<Rule>> {
    pairs.next().ok_or_else(|| get_span_error(id, span))
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    Meta {
        start_index: span.start(),
        end_index: span.end(),
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_if
            | Rule::kw_else
            | Rule::kw_while
            | Rule::kw_do
            | Rule::kw_for
            | Rule::kw_switch
            | Rule::kw_case
            | Rule::kw_default
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_return
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_catch
            | Rule::kw_finally
    )
}

/// Inner pairs of `pair` with the keyword tokens dropped.
fn significant_pairs(pair: Pair<Rule>) -> std::vec::IntoIter<Pair<Rule>> {
    pair.into_inner()
        .filter(|p| !is_keyword(p.as_rule()))
        .collect::<Vec<_>>()
        .into_iter()
}

// ============================================================================
// Statements
// ============================================================================

fn build_ast_from_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let span = pair.as_span();
    let inner_pair = next_pair(&mut pair.into_inner(), &span, 3)?;
    let meta = get_meta(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::block_statement => {
            StatementType::BlockStatement(build_ast_from_block_statement(inner_pair)?)
        }
        Rule::empty_statement => StatementType::EmptyStatement { meta },
        Rule::variable_statement => {
            let span = inner_pair.as_span();
            let list = next_pair(&mut inner_pair.into_inner(), &span, 4)?;
            StatementType::VariableDeclaration(build_ast_from_variable_declaration_list(list)?)
        }
        Rule::if_statement => {
            let span = inner_pair.as_span();
            let mut parts = significant_pairs(inner_pair);
            let test = build_ast_from_expression(next_pair(&mut parts, &span, 5)?)?;
            let consequent = build_ast_from_statement(next_pair(&mut parts, &span, 6)?)?;
            let alternate = match parts.next() {
                Some(p) => Some(Box::new(build_ast_from_statement(p)?)),
                None => None,
            };
            StatementType::IfStatement {
                meta,
                test,
                consequent: Box::new(consequent),
                alternate,
            }
        }
        Rule::while_statement => {
            let span = inner_pair.as_span();
            let mut parts = significant_pairs(inner_pair);
            let test = build_ast_from_expression(next_pair(&mut parts, &span, 7)?)?;
            let body = build_ast_from_statement(next_pair(&mut parts, &span, 8)?)?;
            StatementType::WhileStatement {
                meta,
                test,
                body: Box::new(body),
            }
        }
        Rule::do_while_statement => {
            let span = inner_pair.as_span();
            let mut parts = significant_pairs(inner_pair);
            let body = build_ast_from_statement(next_pair(&mut parts, &span, 9)?)?;
            let test = build_ast_from_expression(next_pair(&mut parts, &span, 10)?)?;
            StatementType::DoWhileStatement {
                meta,
                body: Box::new(body),
                test,
            }
        }
        Rule::for_in_of_statement => build_ast_from_for_in_of_statement(inner_pair)?,
        Rule::for_statement => build_ast_from_for_statement(inner_pair)?,
        Rule::switch_statement => build_ast_from_switch_statement(inner_pair)?,
        Rule::break_statement => StatementType::BreakStatement { meta },
        Rule::continue_statement => StatementType::ContinueStatement { meta },
        Rule::return_statement => {
            let argument = match significant_pairs(inner_pair).next() {
                Some(p) => Some(build_ast_from_expression(p)?),
                None => None,
            };
            StatementType::ReturnStatement { meta, argument }
        }
        Rule::throw_statement => {
            let span = inner_pair.as_span();
            let mut parts = significant_pairs(inner_pair);
            let argument = build_ast_from_expression(next_pair(&mut parts, &span, 11)?)?;
            StatementType::ThrowStatement { meta, argument }
        }
        Rule::try_statement => build_ast_from_try_statement(inner_pair)?,
        Rule::expression_statement => {
            let span = inner_pair.as_span();
            let expression =
                build_ast_from_expression(next_pair(&mut inner_pair.into_inner(), &span, 12)?)?;
            StatementType::ExpressionStatement { meta, expression }
        }
        _ => return Err(get_unexpected_error(13, &inner_pair)),
    })
}

fn build_ast_from_block_statement(pair: Pair<Rule>) -> Result<BlockStatementData, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut body = vec![];
    for inner_pair in pair.into_inner() {
        body.push(build_ast_from_statement(inner_pair)?);
    }
    Ok(BlockStatementData { meta, body })
}

fn get_declaration_kind(pair: &Pair<Rule>) -> Result<VariableDeclarationKind, Error<Rule>> {
    Ok(match pair.as_str() {
        "var" => VariableDeclarationKind::Var,
        "let" => VariableDeclarationKind::Let,
        "const" => VariableDeclarationKind::Const,
        _ => return Err(get_unexpected_error(14, pair)),
    })
}

fn build_ast_from_variable_declaration_list(
    pair: Pair<Rule>,
) -> Result<VariableDeclarationData, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let kind = get_declaration_kind(&next_pair(&mut inner, &span, 15)?)?;
    let mut declarations = vec![];
    for declarator_pair in inner {
        let span = declarator_pair.as_span();
        let mut parts = declarator_pair.into_inner();
        let id = get_identifier_data(next_pair(&mut parts, &span, 16)?);
        let init = match parts.next() {
            Some(p) => Some(build_ast_from_assignment_expression(p)?),
            None => None,
        };
        declarations.push(VariableDeclaratorData { id, init });
    }
    Ok(VariableDeclarationData {
        meta,
        kind,
        declarations,
    })
}

fn build_ast_from_for_in_of_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut parts = significant_pairs(pair);
    let left_pair = next_pair(&mut parts, &span, 17)?;
    let left = match left_pair.as_rule() {
        Rule::for_binding => {
            let span = left_pair.as_span();
            let mut binding = left_pair.into_inner();
            let kind = get_declaration_kind(&next_pair(&mut binding, &span, 18)?)?;
            let id = get_identifier_data(next_pair(&mut binding, &span, 19)?);
            ForIteratorLeft::Binding { kind, id }
        }
        Rule::postfix_expression => {
            let target = build_ast_from_postfix_expression(left_pair.clone())?;
            match target.into_pattern() {
                Ok(pattern) => ForIteratorLeft::Pattern(pattern),
                Err(_) => {
                    return Err(get_semantic_error(
                        "Invalid left-hand side in for-loop",
                        &left_pair,
                    ))
                }
            }
        }
        _ => return Err(get_unexpected_error(20, &left_pair)),
    };
    let kind_pair = next_pair(&mut parts, &span, 21)?;
    let right = build_ast_from_expression(next_pair(&mut parts, &span, 22)?)?;
    let body = Box::new(build_ast_from_statement(next_pair(&mut parts, &span, 23)?)?);
    let data = ForIteratorData {
        meta,
        left,
        right,
        body,
    };
    match kind_pair.as_rule() {
        Rule::kw_in => Ok(StatementType::ForInStatement(data)),
        Rule::kw_of => Ok(StatementType::ForOfStatement(data)),
        _ => Err(get_unexpected_error(24, &kind_pair)),
    }
}

fn build_ast_from_for_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;
    for inner_pair in significant_pairs(pair) {
        match inner_pair.as_rule() {
            Rule::for_init => {
                let span = inner_pair.as_span();
                let init_pair = next_pair(&mut inner_pair.into_inner(), &span, 25)?;
                init = Some(match init_pair.as_rule() {
                    Rule::variable_declaration_list => ForInit::VariableDeclaration(
                        build_ast_from_variable_declaration_list(init_pair)?,
                    ),
                    Rule::expression => ForInit::Expression(build_ast_from_expression(init_pair)?),
                    _ => return Err(get_unexpected_error(26, &init_pair)),
                });
            }
            Rule::for_test | Rule::for_update => {
                let rule = inner_pair.as_rule();
                let span = inner_pair.as_span();
                let expression =
                    build_ast_from_expression(next_pair(&mut inner_pair.into_inner(), &span, 27)?)?;
                if rule == Rule::for_test {
                    test = Some(expression);
                } else {
                    update = Some(expression);
                }
            }
            Rule::statement => body = Some(build_ast_from_statement(inner_pair)?),
            _ => return Err(get_unexpected_error(28, &inner_pair)),
        }
    }
    match body {
        Some(body) => Ok(StatementType::ForStatement {
            meta,
            init,
            test,
            update,
            body: Box::new(body),
        }),
        None => Err(get_span_error(63, &span)),
    }
}

fn build_ast_from_switch_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut parts = significant_pairs(pair);
    let discriminant = build_ast_from_expression(next_pair(&mut parts, &span, 29)?)?;
    let mut cases = vec![];
    for clause_pair in parts {
        let clause_meta = get_meta(&clause_pair);
        let is_default = clause_pair.as_rule() == Rule::default_clause;
        let mut clause_parts = significant_pairs(clause_pair);
        let test = if is_default {
            None
        } else {
            match clause_parts.next() {
                Some(p) => Some(build_ast_from_expression(p)?),
                None => None,
            }
        };
        let mut consequent = vec![];
        for statement_pair in clause_parts {
            consequent.push(build_ast_from_statement(statement_pair)?);
        }
        cases.push(SwitchCaseData {
            meta: clause_meta,
            test,
            consequent,
        });
    }
    Ok(StatementType::SwitchStatement {
        meta,
        discriminant,
        cases,
    })
}

fn build_ast_from_try_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut parts = significant_pairs(pair);
    let block = build_ast_from_block_statement(next_pair(&mut parts, &span, 30)?)?;
    let mut handler = None;
    let mut finalizer = None;
    for clause_pair in parts {
        match clause_pair.as_rule() {
            Rule::catch_clause => {
                let clause_meta = get_meta(&clause_pair);
                let mut param = None;
                let mut body = None;
                for p in significant_pairs(clause_pair) {
                    match p.as_rule() {
                        Rule::identifier => param = Some(get_identifier_data(p)),
                        Rule::block_statement => body = Some(build_ast_from_block_statement(p)?),
                        _ => return Err(get_unexpected_error(31, &p)),
                    }
                }
                let body = match body {
                    Some(body) => body,
                    None => return Err(get_span_error(65, &span)),
                };
                handler = Some(CatchClauseData {
                    meta: clause_meta,
                    param,
                    body,
                });
            }
            Rule::finally_clause => {
                let span = clause_pair.as_span();
                let block_pair = next_pair(&mut significant_pairs(clause_pair), &span, 32)?;
                finalizer = Some(build_ast_from_block_statement(block_pair)?);
            }
            _ => return Err(get_unexpected_error(33, &clause_pair)),
        }
    }
    Ok(StatementType::TryStatement {
        meta,
        block,
        handler,
        finalizer,
    })
}

// ============================================================================
// Expressions
// ============================================================================

fn build_ast_from_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut expressions = vec![];
    for inner_pair in pair.into_inner() {
        expressions.push(build_ast_from_assignment_expression(inner_pair)?);
    }
    if expressions.len() == 1 {
        if let Some(only) = expressions.pop() {
            return Ok(only);
        }
    }
    Ok(ExpressionType::SequenceExpression { meta, expressions })
}

fn get_assignment_operator(pair: &Pair<Rule>) -> Result<AssignmentOperator, Error<Rule>> {
    Ok(match pair.as_str() {
        "=" => AssignmentOperator::Equals,
        "+=" => AssignmentOperator::AddEquals,
        "-=" => AssignmentOperator::SubtractEquals,
        "*=" => AssignmentOperator::MultiplyEquals,
        "/=" => AssignmentOperator::DivideEquals,
        "%=" => AssignmentOperator::ModuloEquals,
        "**=" => AssignmentOperator::ExponentEquals,
        _ => return Err(get_unexpected_error(34, pair)),
    })
}

fn build_ast_from_assignment_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut operands = vec![];
    let mut operators = vec![];
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::conditional_expression => operands.push(inner_pair),
            Rule::assignment_operator => operators.push(get_assignment_operator(&inner_pair)?),
            _ => return Err(get_unexpected_error(35, &inner_pair)),
        }
    }
    let value_pair = match operands.pop() {
        Some(p) => p,
        None => return Err(get_span_error(36, &span)),
    };
    let value = build_ast_from_conditional_expression(value_pair)?;
    if operators.is_empty() {
        return Ok(value);
    }
    let mut targets = vec![];
    for (target_pair, operator) in operands.into_iter().zip(operators) {
        let target = build_ast_from_conditional_expression(target_pair.clone())?;
        match target.into_pattern() {
            Ok(pattern) => targets.push((pattern, operator)),
            Err(_) => {
                return Err(get_semantic_error(
                    "Invalid left-hand side in assignment",
                    &target_pair,
                ))
            }
        }
    }
    Ok(ExpressionType::AssignmentExpression {
        meta,
        targets,
        value: Box::new(value),
    })
}

fn build_ast_from_conditional_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair
        .into_inner()
        .filter(|p| p.as_rule() != Rule::question_mark);
    let mut tests = vec![build_ast_from_coalesce_expression(next_pair(&mut inner, &span, 37)?)?];
    let mut consequents = vec![];
    while let Some(consequent_pair) = inner.next() {
        consequents.push(build_ast_from_assignment_expression(consequent_pair)?);
        tests.push(build_ast_from_coalesce_expression(next_pair(&mut inner, &span, 38)?)?);
    }
    // The last operand is the final alternate, the rest pair up with consequents.
    let alternate = match tests.pop() {
        Some(alternate) => alternate,
        None => return Err(get_span_error(38, &span)),
    };
    if consequents.is_empty() {
        return Ok(alternate);
    }
    Ok(ExpressionType::ConditionalExpression {
        meta,
        branches: tests.into_iter().zip(consequents).collect(),
        alternate: Box::new(alternate),
    })
}

fn build_ast_from_logical_expression<'i>(
    pair: Pair<'i, Rule>,
    operator: LogicalOperator,
    build_operand: fn(Pair<'i, Rule>) -> Result<ExpressionType, Error<Rule>>,
) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let mut operands = vec![];
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::and_op | Rule::or_op | Rule::coalesce_op => { /* Operator is fixed per level */ }
            _ => operands.push(build_operand(inner_pair)?),
        }
    }
    if operands.len() == 1 {
        if let Some(only) = operands.pop() {
            return Ok(only);
        }
    }
    Ok(ExpressionType::LogicalExpression {
        meta,
        operator,
        operands,
    })
}

fn build_ast_from_coalesce_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_logical_expression(
        pair,
        LogicalOperator::NullishCoalescing,
        build_ast_from_logical_or_expression,
    )
}

fn build_ast_from_logical_or_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_logical_expression(
        pair,
        LogicalOperator::Or,
        build_ast_from_logical_and_expression,
    )
}

fn build_ast_from_logical_and_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_logical_expression(
        pair,
        LogicalOperator::And,
        build_ast_from_equality_expression,
    )
}

fn get_binary_operator(pair: &Pair<Rule>) -> Result<BinaryOperator, Error<Rule>> {
    Ok(match pair.as_str() {
        "===" => BinaryOperator::StrictlyEqual,
        "!==" => BinaryOperator::StrictlyUnequal,
        "==" => BinaryOperator::LooselyEqual,
        "!=" => BinaryOperator::LooselyUnequal,
        "<" => BinaryOperator::LessThan,
        ">" => BinaryOperator::GreaterThan,
        "<=" => BinaryOperator::LessThanEqual,
        ">=" => BinaryOperator::GreaterThanEqual,
        "in" => BinaryOperator::In,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Modulo,
        _ => return Err(get_unexpected_error(39, pair)),
    })
}

fn build_ast_from_binary_expression<'i>(
    pair: Pair<'i, Rule>,
    build_operand: fn(Pair<'i, Rule>) -> Result<ExpressionType, Error<Rule>>,
) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut pair_iter = pair.into_inner();
    let first_one = build_operand(next_pair(&mut pair_iter, &span, 40)?)?;
    let mut rest = vec![];
    while let Some(operator_pair) = pair_iter.next() {
        let operator = get_binary_operator(&operator_pair)?;
        let operand = build_operand(next_pair(&mut pair_iter, &span, 41)?)?;
        rest.push((operator, operand));
    }
    if rest.is_empty() {
        Ok(first_one)
    } else {
        Ok(ExpressionType::BinaryExpression {
            meta,
            first: Box::new(first_one),
            rest,
        })
    }
}

fn build_ast_from_equality_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_binary_expression(pair, build_ast_from_relational_expression)
}

fn build_ast_from_relational_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_binary_expression(pair, build_ast_from_additive_expression)
}

fn build_ast_from_additive_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_binary_expression(pair, build_ast_from_multiplicative_expression)
}

fn build_ast_from_multiplicative_expression(
    pair: Pair<Rule>,
) -> Result<ExpressionType, Error<Rule>> {
    build_ast_from_binary_expression(pair, build_ast_from_exponent_expression)
}

fn has_unary_operator(pair: &Pair<Rule>) -> bool {
    pair.clone()
        .into_inner()
        .next()
        .map(|p| p.as_rule() == Rule::unary_operator)
        .unwrap_or(false)
}

fn build_ast_from_exponent_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let unary_pairs: Vec<Pair<Rule>> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::unary_expression)
        .collect();
    let last = unary_pairs.len().saturating_sub(1);
    let mut operands = vec![];
    for (index, unary_pair) in unary_pairs.into_iter().enumerate() {
        if index < last && has_unary_operator(&unary_pair) {
            return Err(get_semantic_error(
                "Unary operator used immediately before exponentiation expression",
                &unary_pair,
            ));
        }
        operands.push(build_ast_from_unary_expression(unary_pair)?);
    }
    if operands.len() == 1 {
        if let Some(only) = operands.pop() {
            return Ok(only);
        }
    }
    Ok(ExpressionType::ExponentExpression { meta, operands })
}

fn build_ast_from_unary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut operators = vec![];
    let mut argument = None;
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::unary_operator => operators.push(match inner_pair.as_str() {
                "!" => UnaryOperator::LogicalNot,
                "-" => UnaryOperator::Minus,
                "+" => UnaryOperator::Plus,
                "typeof" => UnaryOperator::TypeOf,
                "void" => UnaryOperator::Void,
                _ => return Err(get_unexpected_error(42, &inner_pair)),
            }),
            Rule::update_expression => {
                argument = Some(build_ast_from_update_expression(inner_pair)?)
            }
            _ => return Err(get_unexpected_error(43, &inner_pair)),
        }
    }
    let argument = match argument {
        Some(argument) => argument,
        None => return Err(get_span_error(64, &span)),
    };
    if operators.is_empty() {
        Ok(argument)
    } else {
        Ok(ExpressionType::UnaryExpression {
            meta,
            operators,
            argument: Box::new(argument),
        })
    }
}

fn get_update_operator(pair: &Pair<Rule>) -> Result<UpdateOperator, Error<Rule>> {
    Ok(match pair.as_str() {
        "++" => UpdateOperator::PlusPlus,
        "--" => UpdateOperator::MinusMinus,
        _ => return Err(get_unexpected_error(44, pair)),
    })
}

fn build_update_target(pair: Pair<Rule>) -> Result<PatternType, Error<Rule>> {
    let target = build_ast_from_postfix_expression(pair.clone())?;
    target.into_pattern().map_err(|_| {
        get_semantic_error(
            "Invalid left-hand side expression in update operation",
            &pair,
        )
    })
}

fn build_ast_from_update_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let first = next_pair(&mut inner, &span, 45)?;
    if first.as_rule() == Rule::update_op {
        let operator = get_update_operator(&first)?;
        let argument = build_update_target(next_pair(&mut inner, &span, 46)?)?;
        return Ok(ExpressionType::UpdateExpression {
            meta,
            operator,
            argument,
            prefix: true,
        });
    }
    match inner.next() {
        None => build_ast_from_postfix_expression(first),
        Some(operator_pair) => {
            let operator = get_update_operator(&operator_pair)?;
            let argument = build_update_target(first)?;
            Ok(ExpressionType::UpdateExpression {
                meta,
                operator,
                argument,
                prefix: false,
            })
        }
    }
}

fn build_ast_from_postfix_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let object = build_ast_from_primary_expression(next_pair(&mut inner, &span, 47)?)?;
    let mut accessors = vec![];
    for accessor_pair in inner {
        let accessor_span = accessor_pair.as_span();
        accessors.push(match accessor_pair.as_rule() {
            Rule::member_dot => {
                let name = next_pair(&mut accessor_pair.into_inner(), &accessor_span, 48)?;
                Accessor::Member(PropertyKey::Static(name.as_str().to_string()))
            }
            Rule::member_index => {
                let expression = next_pair(&mut accessor_pair.into_inner(), &accessor_span, 49)?;
                Accessor::Member(PropertyKey::Computed(Box::new(build_ast_from_expression(
                    expression,
                )?)))
            }
            Rule::call_arguments => {
                let mut arguments = vec![];
                for argument_pair in accessor_pair.into_inner() {
                    arguments.push(build_ast_from_assignment_expression(argument_pair)?);
                }
                Accessor::Call(arguments)
            }
            _ => return Err(get_unexpected_error(50, &accessor_pair)),
        });
    }
    if accessors.is_empty() {
        Ok(object)
    } else {
        Ok(ExpressionType::MemberExpression {
            meta,
            object: Box::new(object),
            accessors,
        })
    }
}

fn get_identifier_data(pair: Pair<Rule>) -> IdentifierData {
    IdentifierData {
        name: pair.as_str().to_string(),
        meta: get_meta(&pair),
    }
}

fn build_ast_from_primary_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let span = pair.as_span();
    let inner_pair = next_pair(&mut pair.into_inner(), &span, 51)?;
    let meta = get_meta(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::literal => ExpressionType::Literal(build_ast_from_literal(inner_pair)?),
        Rule::identifier => ExpressionType::Identifier(get_identifier_data(inner_pair)),
        Rule::parenthesized_expression => {
            let span = inner_pair.as_span();
            build_ast_from_expression(next_pair(&mut inner_pair.into_inner(), &span, 52)?)?
        }
        Rule::array_literal => {
            let mut elements = vec![];
            for element_pair in inner_pair.into_inner() {
                elements.push(build_ast_from_assignment_expression(element_pair)?);
            }
            ExpressionType::ArrayExpression { meta, elements }
        }
        Rule::object_literal => {
            let mut properties = vec![];
            for property_pair in inner_pair.into_inner() {
                properties.push(build_ast_from_property(property_pair)?);
            }
            ExpressionType::ObjectExpression { meta, properties }
        }
        _ => return Err(get_unexpected_error(53, &inner_pair)),
    })
}

fn build_ast_from_property(pair: Pair<Rule>) -> Result<PropertyData, Error<Rule>> {
    let meta = get_meta(&pair);
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let first = next_pair(&mut inner, &span, 54)?;
    if first.as_rule() == Rule::identifier {
        let id = get_identifier_data(first);
        return Ok(PropertyData {
            key: id.name.clone(),
            value: ExpressionType::Identifier(id),
            meta,
        });
    }
    let key_span = first.as_span();
    let key_pair = next_pair(&mut first.into_inner(), &key_span, 55)?;
    let key = match key_pair.as_rule() {
        Rule::identifier_name => key_pair.as_str().to_string(),
        Rule::string_literal => get_string_value(key_pair)?,
        Rule::numeric_literal => number_to_string(get_numeric_value(key_pair)?),
        _ => return Err(get_unexpected_error(56, &key_pair)),
    };
    let value = build_ast_from_assignment_expression(next_pair(&mut inner, &span, 57)?)?;
    Ok(PropertyData { key, value, meta })
}

// ============================================================================
// Literals
// ============================================================================

fn build_ast_from_literal(pair: Pair<Rule>) -> Result<LiteralData, Error<Rule>> {
    let span = pair.as_span();
    let inner_pair = next_pair(&mut pair.into_inner(), &span, 58)?;
    let meta = get_meta(&inner_pair);
    let value = match inner_pair.as_rule() {
        Rule::null_literal => LiteralType::NullLiteral,
        Rule::undefined_literal => LiteralType::UndefinedLiteral,
        Rule::boolean_literal => LiteralType::BooleanLiteral(inner_pair.as_str() == "true"),
        Rule::numeric_literal => LiteralType::NumberLiteral(get_numeric_value(inner_pair)?),
        Rule::string_literal => LiteralType::StringLiteral(get_string_value(inner_pair)?),
        _ => return Err(get_unexpected_error(59, &inner_pair)),
    };
    Ok(LiteralData { value, meta })
}

fn get_numeric_value(pair: Pair<Rule>) -> Result<f64, Error<Rule>> {
    let span = pair.as_span();
    let inner_pair = next_pair(&mut pair.into_inner(), &span, 60)?;
    match inner_pair.as_rule() {
        Rule::hex_integer_literal => Ok(inner_pair.as_str()[2..]
            .chars()
            .filter_map(|c| c.to_digit(16))
            .fold(0_f64, |acc, d| acc * 16.0 + d as f64)),
        Rule::decimal_literal => {
            let mut text = inner_pair.as_str().to_string();
            if text.starts_with('.') {
                text.insert(0, '0');
            }
            text = text.replace(".e", ".0e").replace(".E", ".0E");
            if text.ends_with('.') {
                text.push('0');
            }
            text.parse::<f64>()
                .map_err(|_| get_semantic_error("Invalid number literal", &inner_pair))
        }
        _ => Err(get_unexpected_error(61, &inner_pair)),
    }
}

fn get_string_value(pair: Pair<Rule>) -> Result<String, Error<Rule>> {
    let span = pair.as_span();
    let characters = next_pair(&mut pair.into_inner(), &span, 62)?;
    Ok(unescape_string(characters.as_str()))
}

fn read_hex(chars: &[char], start: usize, len: usize) -> Option<u32> {
    if start + len > chars.len() {
        return None;
    }
    let mut value = 0;
    for c in &chars[start..start + len] {
        value = value * 16 + c.to_digit(16)?;
    }
    Some(value)
}

/// Resolve the escape sequences of a string literal body.
pub(crate) fn unescape_string(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.get(i) {
            Some(e) => *e,
            None => break,
        };
        i += 1;
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => {
                if let Some(code) = read_hex(&chars, i, 2) {
                    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    i += 2;
                }
            }
            'u' if chars.get(i) == Some(&'{') => {
                let close = chars[i..].iter().position(|c| *c == '}');
                if let Some(close) = close {
                    if let Some(code) = read_hex(&chars, i + 1, close - 1) {
                        out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    }
                    i += close + 1;
                }
            }
            'u' => {
                if let Some(unit) = read_hex(&chars, i, 4) {
                    i += 4;
                    if (0xD800..0xDC00).contains(&unit)
                        && chars.get(i) == Some(&'\\')
                        && chars.get(i + 1) == Some(&'u')
                    {
                        if let Some(low) = read_hex(&chars, i + 2, 4) {
                            if (0xDC00..0xE000).contains(&low) {
                                let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                                i += 6;
                                continue;
                            }
                        }
                    }
                    out.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
                }
            }
            '\r' => {
                if chars.get(i) == Some(&'\n') {
                    i += 1;
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }
    out
}
