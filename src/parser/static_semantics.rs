use std::collections::HashSet;

use crate::parser::ast::{
    BlockStatementData, ForInit, Meta, Script, StatementType, VariableDeclarationData,
    VariableDeclarationKind,
};
use crate::parser::ParseError;

/// Words that parse to nothing in this language but mean something in full
/// JavaScript. Rejected up front so the author gets a direct message.
const UNSUPPORTED_WORDS: [&str; 11] = [
    "function",
    "class",
    "new",
    "this",
    "delete",
    "instanceof",
    "with",
    "yield",
    "await",
    "import",
    "export",
];

/// Words after which a line break does not finish a statement.
const CONTINUATION_WORDS: [&str; 12] = [
    "if", "while", "for", "do", "else", "typeof", "void", "in", "of", "var", "let", "const",
];

pub(crate) fn line_col(script: &str, index: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (offset, c) in script.char_indices() {
        if offset >= index {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn error_at(script: &str, index: usize, message: impl Into<String>) -> ParseError {
    let (line, column) = line_col(script, index);
    ParseError {
        message: message.into(),
        line,
        column,
    }
}

// ============================================================================
// Nesting pre-scan
// ============================================================================

#[derive(Default)]
struct Level {
    /// Unfinished `if`/`while`/`for`/`do`/`else` statements opened at this level.
    chain: usize,
    /// Chain length of the statement that just finished, resumed by `else`.
    ended_chain: usize,
    /// Open `?` without a matching `:`.
    ternary: usize,
    /// A control keyword was seen and its `( ... )` header has not started.
    header_pending: bool,
    /// The header just closed and the body has not started.
    awaiting_body: bool,
    /// This level is the parenthesised header of a control statement.
    is_header: bool,
}

struct NestingScan<'s> {
    script: &'s str,
    max_depth: usize,
    levels: Vec<Level>,
    depth: usize,
    /// Whether the last significant token can end a statement at a line break.
    ends_statement: bool,
    last_char: Option<char>,
}

impl<'s> NestingScan<'s> {
    fn current(&mut self) -> &mut Level {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    fn grow(&mut self, offset: usize, by: usize) -> Result<(), ParseError> {
        self.depth += by;
        if self.depth > self.max_depth {
            return Err(error_at(
                self.script,
                offset,
                format!("Maximum nesting depth of {} exceeded", self.max_depth),
            ));
        }
        Ok(())
    }

    fn end_chain(&mut self) {
        let level = self.current();
        let chain = level.chain;
        level.ended_chain = chain;
        level.chain = 0;
        level.header_pending = false;
        level.awaiting_body = false;
        self.depth -= chain;
    }

    fn open(&mut self, offset: usize, c: char) -> Result<(), ParseError> {
        let parent = self.current();
        let is_header = c == '(' && parent.header_pending;
        parent.header_pending = false;
        parent.awaiting_body = false;
        self.levels.push(Level {
            is_header,
            ..Level::default()
        });
        self.grow(offset, 1)
    }

    fn close(&mut self, c: char) {
        if self.levels.len() < 2 {
            return;
        }
        if let Some(closed) = self.levels.pop() {
            self.depth -= 1 + closed.chain + closed.ternary;
            if closed.is_header {
                self.current().awaiting_body = true;
            } else if c == '}' {
                self.end_chain();
            }
        }
    }

    fn word(&mut self, offset: usize, word: &str, next: Option<char>) -> Result<(), ParseError> {
        let after_dot = self.last_char == Some('.');
        if !after_dot && next != Some(':') && UNSUPPORTED_WORDS.contains(&word) {
            return Err(error_at(
                self.script,
                offset,
                format!("Unsupported syntax: '{}'", word),
            ));
        }
        if after_dot {
            return Ok(());
        }
        match word {
            "if" | "while" | "for" => {
                let level = self.current();
                level.chain += 1;
                level.header_pending = true;
                level.awaiting_body = false;
                self.grow(offset, 1)?;
            }
            "do" => {
                let level = self.current();
                level.chain += 1;
                level.awaiting_body = true;
                self.grow(offset, 1)?;
            }
            "else" => {
                let level = self.current();
                let resumed = level.ended_chain + 1;
                level.chain += resumed;
                level.awaiting_body = true;
                self.grow(offset, resumed)?;
            }
            _ => {
                self.current().awaiting_body = false;
            }
        }
        Ok(())
    }
}

fn skip_string(chars: &[(usize, char)], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i].1 {
            '\\' => i += 2,
            '\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Bounds how deeply the parser and the evaluator will recurse for `script`.
///
/// Counts open brackets, open `?:` and unfinished control statement chains.
/// Strings and comments are skipped with the same lexical rules as the grammar.
pub(crate) fn check_nesting_depth(script: &str, max_depth: usize) -> Result<(), ParseError> {
    let chars: Vec<(usize, char)> = script.char_indices().collect();
    let mut scan = NestingScan {
        script,
        max_depth,
        levels: vec![Level::default()],
        depth: 0,
        ends_statement: false,
        last_char: None,
    };

    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, n)| *n);
        match c {
            '\n' | '\u{2028}' | '\u{2029}' => {
                let ends_statement = scan.ends_statement;
                let level = scan.current();
                if ends_statement
                    && level.chain > 0
                    && !level.header_pending
                    && !level.awaiting_body
                {
                    scan.end_chain();
                }
                i += 1;
                continue;
            }
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i].1 != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len()
                    && !(chars[i].1 == '*' && chars.get(i + 1).map(|(_, n)| *n) == Some('/'))
                {
                    i += 1;
                }
                i += 2;
                continue;
            }
            '"' | '\'' => {
                i = skip_string(&chars, i, c);
                scan.current().awaiting_body = false;
                scan.ends_statement = true;
                scan.last_char = Some(c);
                continue;
            }
            '`' => {
                return Err(error_at(script, offset, "Unsupported syntax: template literal"));
            }
            '(' | '[' | '{' => {
                scan.open(offset, c)?;
                scan.ends_statement = false;
            }
            ')' | ']' | '}' => {
                scan.close(c);
                scan.ends_statement = true;
            }
            ';' => {
                scan.end_chain();
                scan.ends_statement = false;
            }
            '?' => {
                if next == Some('?') {
                    i += 2;
                    scan.ends_statement = false;
                    scan.last_char = Some('?');
                    continue;
                }
                scan.current().ternary += 1;
                scan.current().awaiting_body = false;
                scan.grow(offset, 1)?;
                scan.ends_statement = false;
            }
            ':' => {
                let level = scan.current();
                if level.ternary > 0 {
                    level.ternary -= 1;
                    scan.depth -= 1;
                }
                scan.ends_statement = false;
            }
            '=' if next == Some('>') => {
                return Err(error_at(script, offset, "Unsupported syntax: arrow function"));
            }
            '&' | '|' => {
                if next == Some(c) {
                    i += 2;
                    scan.current().awaiting_body = false;
                    scan.ends_statement = false;
                    scan.last_char = Some(c);
                    continue;
                }
                return Err(error_at(
                    script,
                    offset,
                    format!("Unsupported operator: '{}'", c),
                ));
            }
            '^' | '~' => {
                return Err(error_at(
                    script,
                    offset,
                    format!("Unsupported operator: '{}'", c),
                ));
            }
            '<' | '>' if next == Some(c) => {
                return Err(error_at(
                    script,
                    offset,
                    format!("Unsupported operator: '{}{}'", c, c),
                ));
            }
            c if is_word_start(c) => {
                let start = i;
                while i < chars.len() && is_word_part(chars[i].1) {
                    i += 1;
                }
                let end = chars.get(i).map(|(o, _)| *o).unwrap_or(script.len());
                let word = &script[offset..end];
                let mut j = i;
                while j < chars.len() && chars[j].1.is_whitespace() && chars[j].1 != '\n' {
                    j += 1;
                }
                let next_significant = chars.get(j).map(|(_, n)| *n);
                scan.word(chars[start].0, word, next_significant)?;
                scan.ends_statement = !CONTINUATION_WORDS.contains(&word);
                scan.last_char = Some('a');
                continue;
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (is_word_part(chars[i].1) || chars[i].1 == '.') {
                    i += 1;
                }
                scan.current().awaiting_body = false;
                scan.ends_statement = true;
                scan.last_char = Some('0');
                continue;
            }
            '+' | '-' if next == Some(c) => {
                i += 2;
                scan.current().awaiting_body = false;
                scan.ends_statement = true;
                scan.last_char = Some(c);
                continue;
            }
            _ => {
                scan.current().awaiting_body = false;
                scan.ends_statement = false;
            }
        }
        scan.last_char = Some(c);
        i += 1;
    }
    Ok(())
}

// ============================================================================
// Early errors
// ============================================================================

#[derive(Clone, Copy, Default)]
struct Placement {
    in_iteration: bool,
    in_breakable: bool,
}

struct Validator<'s> {
    script: &'s str,
}

impl<'s> Validator<'s> {
    fn error(&self, meta: &Meta, message: impl Into<String>) -> ParseError {
        error_at(self.script, meta.start_index, message)
    }

    fn declare_lexical(
        &self,
        declaration: &VariableDeclarationData,
        scope: &mut HashSet<String>,
    ) -> Result<(), ParseError> {
        for declarator in &declaration.declarations {
            if declaration.kind == VariableDeclarationKind::Const && declarator.init.is_none() {
                return Err(self.error(
                    &declarator.id.meta,
                    "Missing initializer in const declaration",
                ));
            }
            if declaration.kind != VariableDeclarationKind::Var
                && !scope.insert(declarator.id.name.clone())
            {
                return Err(self.error(
                    &declarator.id.meta,
                    format!("Identifier '{}' has already been declared", declarator.id.name),
                ));
            }
        }
        Ok(())
    }

    fn statement_list(
        &self,
        statements: &[StatementType],
        placement: Placement,
        scope: &mut HashSet<String>,
    ) -> Result<(), ParseError> {
        for statement in statements {
            self.statement(statement, placement, scope)?;
        }
        Ok(())
    }

    fn block(&self, block: &BlockStatementData, placement: Placement) -> Result<(), ParseError> {
        let mut scope = HashSet::new();
        self.statement_list(&block.body, placement, &mut scope)
    }

    fn nested(&self, statement: &StatementType, placement: Placement) -> Result<(), ParseError> {
        let mut scope = HashSet::new();
        self.statement(statement, placement, &mut scope)
    }

    fn statement(
        &self,
        statement: &StatementType,
        placement: Placement,
        scope: &mut HashSet<String>,
    ) -> Result<(), ParseError> {
        let loop_placement = Placement {
            in_iteration: true,
            in_breakable: true,
        }
        .merge(placement);
        match statement {
            StatementType::EmptyStatement { .. }
            | StatementType::ExpressionStatement { .. }
            | StatementType::ReturnStatement { .. }
            | StatementType::ThrowStatement { .. } => Ok(()),
            StatementType::BlockStatement(block) => self.block(block, placement),
            StatementType::VariableDeclaration(declaration) => {
                self.declare_lexical(declaration, scope)
            }
            StatementType::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                self.nested(consequent, placement)?;
                if let Some(alternate) = alternate {
                    self.nested(alternate, placement)?;
                }
                Ok(())
            }
            StatementType::WhileStatement { body, .. }
            | StatementType::DoWhileStatement { body, .. } => self.nested(body, loop_placement),
            StatementType::ForStatement { init, body, .. } => {
                if let Some(ForInit::VariableDeclaration(declaration)) = init {
                    let mut loop_scope = HashSet::new();
                    self.declare_lexical(declaration, &mut loop_scope)?;
                }
                self.nested(body, loop_placement)
            }
            StatementType::ForInStatement(data) | StatementType::ForOfStatement(data) => {
                self.nested(&data.body, loop_placement)
            }
            StatementType::SwitchStatement { cases, meta, .. } => {
                let defaults = cases.iter().filter(|c| c.test.is_none()).count();
                if defaults > 1 {
                    return Err(self.error(
                        meta,
                        "More than one default clause in switch statement",
                    ));
                }
                let mut switch_scope = HashSet::new();
                let switch_placement = Placement {
                    in_iteration: placement.in_iteration,
                    in_breakable: true,
                };
                for case in cases {
                    self.statement_list(&case.consequent, switch_placement, &mut switch_scope)?;
                }
                Ok(())
            }
            StatementType::BreakStatement { meta } => {
                if placement.in_breakable {
                    Ok(())
                } else {
                    Err(self.error(meta, "Illegal break statement"))
                }
            }
            StatementType::ContinueStatement { meta } => {
                if placement.in_iteration {
                    Ok(())
                } else {
                    Err(self.error(
                        meta,
                        "Illegal continue statement: no surrounding iteration statement",
                    ))
                }
            }
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.block(block, placement)?;
                if let Some(handler) = handler {
                    self.block(&handler.body, placement)?;
                }
                if let Some(finalizer) = finalizer {
                    self.block(finalizer, placement)?;
                }
                Ok(())
            }
        }
    }
}

impl Placement {
    fn merge(self, outer: Placement) -> Placement {
        Placement {
            in_iteration: self.in_iteration || outer.in_iteration,
            in_breakable: self.in_breakable || outer.in_breakable,
        }
    }
}

/// Early errors the grammar cannot express: misplaced `break`/`continue`,
/// redeclared `let`/`const`, uninitialised `const` and duplicate `default`.
pub(crate) fn validate_script(script: &Script, source: &str) -> Result<(), ParseError> {
    let validator = Validator { script: source };
    let mut scope = HashSet::new();
    validator.statement_list(&script.statements, Placement::default(), &mut scope)
}
