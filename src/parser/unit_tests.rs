use super::api::{parse_script, Rule, ScriptParser};
use super::ast::*;

use pest::consumes_to;
use pest::fails_with;
use pest::parses_to;
use std::time::Instant;

const DEPTH: usize = 128;

#[test]
fn test_decimal_number_with_no_dot() {
    parses_to! {
        parser: ScriptParser,
        input: "10",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 2, [
                decimal_literal(0, 2, [
                    decimal_integer_literal(0, 2)
                ])
            ])
        ]
    };
}

#[test]
fn test_decimal_number_with_dot() {
    parses_to! {
        parser: ScriptParser,
        input: "10.25",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 5, [
                decimal_literal(0, 5, [
                    decimal_integer_literal(0, 2),
                    decimal_digits(3, 5)
                ])
            ])
        ]
    };
}

#[test]
fn test_decimal_number_with_dot_at_start() {
    parses_to! {
        parser: ScriptParser,
        input: ".5",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 2, [
                decimal_literal(0, 2, [
                    decimal_digits(1, 2)
                ])
            ])
        ]
    };
}

#[test]
fn test_decimal_number_with_exp() {
    parses_to! {
        parser: ScriptParser,
        input: "1e-3",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 4, [
                decimal_literal(0, 4, [
                    decimal_integer_literal(0, 1),
                    exponent_part(1, 4)
                ])
            ])
        ]
    };
}

#[test]
fn test_hex_number() {
    parses_to! {
        parser: ScriptParser,
        input: "0x1F",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 4, [
                hex_integer_literal(0, 4)
            ])
        ]
    };
}

#[test]
fn test_single_quoted_string() {
    parses_to! {
        parser: ScriptParser,
        input: "'ab'",
        rule: Rule::string_literal,
        tokens: [
            string_literal(0, 4, [
                single_string_characters(1, 3)
            ])
        ]
    };
}

#[test]
fn test_double_quoted_string_with_escaped_quote() {
    parses_to! {
        parser: ScriptParser,
        input: "\"a\\\"b\"",
        rule: Rule::string_literal,
        tokens: [
            string_literal(0, 6, [
                double_string_characters(1, 5)
            ])
        ]
    };
}

#[test]
fn test_string_with_newline_fails() {
    fails_with! {
        parser: ScriptParser,
        input: "\"test single\n string\"",
        rule: Rule::string_literal,
        positives: vec![Rule::string_literal],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_identifier_cannot_be_reserved_word() {
    fails_with! {
        parser: ScriptParser,
        input: "var",
        rule: Rule::identifier,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_identifier_cannot_start_with_digit() {
    fails_with! {
        parser: ScriptParser,
        input: "9lives",
        rule: Rule::identifier,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_identifier_may_start_with_reserved_word() {
    parses_to! {
        parser: ScriptParser,
        input: "nullable",
        rule: Rule::primary_expression,
        tokens: [
            primary_expression(0, 8, [
                identifier(0, 8)
            ])
        ]
    };
}

#[test]
fn test_undefined_literal() {
    parses_to! {
        parser: ScriptParser,
        input: "undefined",
        rule: Rule::primary_expression,
        tokens: [
            primary_expression(0, 9, [
                literal(0, 9, [
                    undefined_literal(0, 9)
                ])
            ])
        ]
    };
}

#[test]
fn test_member_dot() {
    parses_to! {
        parser: ScriptParser,
        input: ".length",
        rule: Rule::member_dot,
        tokens: [
            member_dot(0, 7, [
                identifier_name(1, 7)
            ])
        ]
    };
}

#[test]
fn test_member_dot_allows_reserved_word() {
    parses_to! {
        parser: ScriptParser,
        input: ".default",
        rule: Rule::member_dot,
        tokens: [
            member_dot(0, 8, [
                identifier_name(1, 8)
            ])
        ]
    };
}

#[test]
fn test_empty_call_arguments() {
    parses_to! {
        parser: ScriptParser,
        input: "( )",
        rule: Rule::call_arguments,
        tokens: [
            call_arguments(0, 3)
        ]
    };
}

#[test]
fn test_additive_expression() {
    parses_to! {
        parser: ScriptParser,
        input: "1 + 2",
        rule: Rule::additive_expression,
        tokens: [
            additive_expression(0, 5, [
                multiplicative_expression(0, 1, [
                    exponent_expression(0, 1, [
                        unary_expression(0, 1, [
                            update_expression(0, 1, [
                                postfix_expression(0, 1, [
                                    primary_expression(0, 1, [
                                        literal(0, 1, [
                                            numeric_literal(0, 1, [
                                                decimal_literal(0, 1, [
                                                    decimal_integer_literal(0, 1)
                                                ])
                                            ])
                                        ])
                                    ])
                                ])
                            ])
                        ])
                    ])
                ]),
                additive_op(2, 3),
                multiplicative_expression(4, 5, [
                    exponent_expression(4, 5, [
                        unary_expression(4, 5, [
                            update_expression(4, 5, [
                                postfix_expression(4, 5, [
                                    primary_expression(4, 5, [
                                        literal(4, 5, [
                                            numeric_literal(4, 5, [
                                                decimal_literal(4, 5, [
                                                    decimal_integer_literal(4, 5)
                                                ])
                                            ])
                                        ])
                                    ])
                                ])
                            ])
                        ])
                    ])
                ])
            ])
        ]
    };
}

#[test]
fn test_operators() {
    parses_to! {
        parser: ScriptParser,
        input: "**=",
        rule: Rule::assignment_operator,
        tokens: [assignment_operator(0, 3)]
    };
    parses_to! {
        parser: ScriptParser,
        input: "===",
        rule: Rule::equality_op,
        tokens: [equality_op(0, 3)]
    };
    parses_to! {
        parser: ScriptParser,
        input: "typeof",
        rule: Rule::unary_operator,
        tokens: [unary_operator(0, 6)]
    };
}

#[test]
fn test_variable_declaration_list() {
    parses_to! {
        parser: ScriptParser,
        input: "let x",
        rule: Rule::variable_declaration_list,
        tokens: [
            variable_declaration_list(0, 5, [
                declaration_kind(0, 3),
                variable_declarator(4, 5, [
                    identifier(4, 5)
                ])
            ])
        ]
    };
}

#[test]
fn test_break_statement() {
    parses_to! {
        parser: ScriptParser,
        input: "break;",
        rule: Rule::break_statement,
        tokens: [
            break_statement(0, 6, [
                kw_break(0, 5)
            ])
        ]
    };
}

// ============================================================================
// AST
// ============================================================================

fn expression_of(script: &str) -> ExpressionType {
    let mut ast = parse_script(script, DEPTH).unwrap();
    match ast.statements.pop() {
        Some(StatementType::ExpressionStatement { expression, .. }) => expression,
        other => panic!("Expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_statements_without_semicolons() {
    let ast = parse_script("let a = 1\nlet b = 2\na + b", DEPTH).unwrap();
    assert_eq!(ast.statements.len(), 3);
    assert!(matches!(
        &ast.statements[0],
        StatementType::VariableDeclaration(VariableDeclarationData {
            kind: VariableDeclarationKind::Let,
            ..
        })
    ));
    assert!(matches!(
        &ast.statements[2],
        StatementType::ExpressionStatement { .. }
    ));
}

#[test]
fn test_number_literal_value() {
    match expression_of("0x10") {
        ExpressionType::Literal(LiteralData {
            value: LiteralType::NumberLiteral(n),
            ..
        }) => assert_eq!(n, 16.0),
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_string_escapes() {
    match expression_of(r#"'a\nA\x42\'b'"#) {
        ExpressionType::Literal(LiteralData {
            value: LiteralType::StringLiteral(s),
            ..
        }) => assert_eq!(s, "a\nAB'b"),
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_chained_assignment() {
    match expression_of("x = y += 3") {
        ExpressionType::AssignmentExpression { targets, .. } => {
            assert_eq!(targets.len(), 2);
            assert_eq!(targets[0].1, AssignmentOperator::Equals);
            assert_eq!(targets[1].1, AssignmentOperator::AddEquals);
        }
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_exponent_chain() {
    match expression_of("2 ** 3 ** 2") {
        ExpressionType::ExponentExpression { operands, .. } => assert_eq!(operands.len(), 3),
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_nested_conditional() {
    match expression_of("a ? b : c ? d : e") {
        ExpressionType::ConditionalExpression { branches, .. } => assert_eq!(branches.len(), 2),
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_stacked_unary_operators() {
    match expression_of("!!typeof x") {
        ExpressionType::UnaryExpression { operators, .. } => {
            assert_eq!(
                operators,
                vec![
                    UnaryOperator::LogicalNot,
                    UnaryOperator::LogicalNot,
                    UnaryOperator::TypeOf
                ]
            );
        }
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_member_chain() {
    match expression_of("a.b(1)[c]") {
        ExpressionType::MemberExpression { accessors, .. } => {
            assert_eq!(accessors.len(), 3);
            assert!(matches!(accessors[1], Accessor::Call(ref args) if args.len() == 1));
        }
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_for_of_binding() {
    let ast = parse_script("for (const v of list) { total += v }", DEPTH).unwrap();
    match &ast.statements[0] {
        StatementType::ForOfStatement(data) => assert!(matches!(
            data.left,
            ForIteratorLeft::Binding {
                kind: VariableDeclarationKind::Const,
                ..
            }
        )),
        other => panic!("Unexpected {:?}", other),
    }
}

#[test]
fn test_try_catch_finally() {
    let ast = parse_script("try { a() } catch (e) { b } finally { c }", DEPTH).unwrap();
    match &ast.statements[0] {
        StatementType::TryStatement {
            handler, finalizer, ..
        } => {
            assert_eq!(
                handler.as_ref().and_then(|h| h.param.as_ref()).map(|p| p.name.as_str()),
                Some("e")
            );
            assert!(finalizer.is_some());
        }
        other => panic!("Unexpected {:?}", other),
    }
}

// ============================================================================
// Rejected scripts
// ============================================================================

fn error_message(script: &str) -> String {
    parse_script(script, DEPTH).unwrap_err().message
}

#[test]
fn test_unsupported_syntax() {
    assert_eq!(error_message("function f() {}"), "Unsupported syntax: 'function'");
    assert_eq!(error_message("new Date()"), "Unsupported syntax: 'new'");
    assert_eq!(error_message("`x`"), "Unsupported syntax: template literal");
    assert_eq!(error_message("let f = x => x"), "Unsupported syntax: arrow function");
    assert_eq!(error_message("a & b"), "Unsupported operator: '&'");
    assert_eq!(error_message("a << 2"), "Unsupported operator: '<<'");
}

#[test]
fn test_unsupported_words_allowed_as_property_names() {
    assert!(parse_script("o.new + o.this", DEPTH).is_ok());
    assert!(parse_script("({ class: 1 })", DEPTH).is_ok());
}

#[test]
fn test_early_errors() {
    assert_eq!(error_message("break"), "Illegal break statement");
    assert_eq!(
        error_message("if (a) { continue }"),
        "Illegal continue statement: no surrounding iteration statement"
    );
    assert_eq!(
        error_message("const x;"),
        "Missing initializer in const declaration"
    );
    assert_eq!(
        error_message("switch (a) { default: 1; default: 2 }"),
        "More than one default clause in switch statement"
    );
    assert!(parse_script("while (a) { switch (b) { case 1: continue } }", DEPTH).is_ok());
}

#[test]
fn test_redeclaration_position() {
    let error = parse_script("let a = 1;\nlet a = 2;", DEPTH).unwrap_err();
    assert_eq!(error.message, "Identifier 'a' has already been declared");
    assert_eq!((error.line, error.column), (2, 5));
    assert!(parse_script("let a = 1; { let a = 2 }", DEPTH).is_ok());
    assert!(parse_script("var a = 1; var a = 2", DEPTH).is_ok());
}

#[test]
fn test_syntax_error_position() {
    let error = parse_script("let a = ;", DEPTH).unwrap_err();
    assert_eq!(error.line, 1);
    assert!(error.column > 1);
}

#[test]
fn test_nesting_limit() {
    assert!(parse_script("((((1))))", 4).is_ok());
    assert_eq!(
        parse_script("((((1))))", 3).unwrap_err().message,
        "Maximum nesting depth of 3 exceeded"
    );
}

#[test]
fn test_deep_nesting_is_rejected_quickly() {
    let script = format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000));
    let start = Instant::now();
    let result = parse_script(&script, DEPTH);
    assert!(result.is_err());
    assert!(
        start.elapsed().as_millis() < 800,
        "Nesting check taking too long to run."
    );
}

#[test]
fn test_perf1() {
    let start = Instant::now();
    let result = parse_script("[[[[]]]]", DEPTH);
    let end = Instant::now();
    match result {
        Ok(_) => {
            assert!(
                end.saturating_duration_since(start).as_millis() < 800,
                "Script taking too long to run."
            );
        }
        Err(e) => {
            assert!(false, "There was an error {}", e);
        }
    }
}
