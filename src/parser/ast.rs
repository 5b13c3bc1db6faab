#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
}

pub trait HasMeta {
    fn get_meta(&self) -> &Meta;
}

/// A parsed script: the top-level statement list.
#[derive(Debug)]
pub struct Script {
    pub statements: Vec<StatementType>,
}

#[derive(Debug, Clone)]
pub struct IdentifierData {
    pub name: String,
    pub meta: Meta,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug)]
pub enum LiteralType {
    NullLiteral,
    UndefinedLiteral,
    BooleanLiteral(bool),
    NumberLiteral(f64),
    StringLiteral(String),
}

#[derive(Debug)]
pub struct LiteralData {
    pub value: LiteralType,
    pub meta: Meta,
}

/// Key of a member access: `a.b` is static, `a[b]` is computed.
#[derive(Debug)]
pub enum PropertyKey {
    Static(String),
    Computed(Box<ExpressionType>),
}

/// One link of a postfix chain such as `a.b[c](d)`.
#[derive(Debug)]
pub enum Accessor {
    Member(PropertyKey),
    Call(Vec<ExpressionType>),
}

#[derive(Debug)]
pub struct PropertyData {
    pub key: String,
    pub value: ExpressionType,
    pub meta: Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    LogicalNot,
    TypeOf,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    PlusPlus,
    MinusMinus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    StrictlyEqual,
    StrictlyUnequal,
    LooselyEqual,
    LooselyUnequal,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    In,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    NullishCoalescing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Equals,
    AddEquals,
    SubtractEquals,
    MultiplyEquals,
    DivideEquals,
    ModuloEquals,
    ExponentEquals,
}

/// Something that can be assigned to.
#[derive(Debug)]
pub enum PatternType {
    Identifier(IdentifierData),
    Member {
        object: Box<ExpressionType>,
        accessors: Vec<Accessor>,
        property: PropertyKey,
        meta: Meta,
    },
}

impl HasMeta for PatternType {
    fn get_meta(&self) -> &Meta {
        match self {
            PatternType::Identifier(data) => &data.meta,
            PatternType::Member { meta, .. } => meta,
        }
    }
}

#[derive(Debug)]
pub enum ExpressionType {
    Literal(LiteralData),
    Identifier(IdentifierData),
    ArrayExpression {
        meta: Meta,
        elements: Vec<ExpressionType>,
    },
    ObjectExpression {
        meta: Meta,
        properties: Vec<PropertyData>,
    },
    /// `object` followed by member accesses and calls, evaluated left to right.
    MemberExpression {
        meta: Meta,
        object: Box<ExpressionType>,
        accessors: Vec<Accessor>,
    },
    /// Prefix operators, applied innermost (rightmost) first.
    UnaryExpression {
        meta: Meta,
        operators: Vec<UnaryOperator>,
        argument: Box<ExpressionType>,
    },
    UpdateExpression {
        meta: Meta,
        operator: UpdateOperator,
        argument: PatternType,
        prefix: bool,
    },
    /// Left-associative chain of operators sharing one precedence level.
    BinaryExpression {
        meta: Meta,
        first: Box<ExpressionType>,
        rest: Vec<(BinaryOperator, ExpressionType)>,
    },
    /// Right-associative `**` chain.
    ExponentExpression {
        meta: Meta,
        operands: Vec<ExpressionType>,
    },
    LogicalExpression {
        meta: Meta,
        operator: LogicalOperator,
        operands: Vec<ExpressionType>,
    },
    /// `t1 ? c1 : t2 ? c2 : alternate`
    ConditionalExpression {
        meta: Meta,
        branches: Vec<(ExpressionType, ExpressionType)>,
        alternate: Box<ExpressionType>,
    },
    /// `t1 = t2 += value`, applied right to left.
    AssignmentExpression {
        meta: Meta,
        targets: Vec<(PatternType, AssignmentOperator)>,
        value: Box<ExpressionType>,
    },
    SequenceExpression {
        meta: Meta,
        expressions: Vec<ExpressionType>,
    },
}

impl HasMeta for ExpressionType {
    fn get_meta(&self) -> &Meta {
        match self {
            ExpressionType::Literal(data) => &data.meta,
            ExpressionType::Identifier(data) => &data.meta,
            ExpressionType::ArrayExpression { meta, .. } => meta,
            ExpressionType::ObjectExpression { meta, .. } => meta,
            ExpressionType::MemberExpression { meta, .. } => meta,
            ExpressionType::UnaryExpression { meta, .. } => meta,
            ExpressionType::UpdateExpression { meta, .. } => meta,
            ExpressionType::BinaryExpression { meta, .. } => meta,
            ExpressionType::ExponentExpression { meta, .. } => meta,
            ExpressionType::LogicalExpression { meta, .. } => meta,
            ExpressionType::ConditionalExpression { meta, .. } => meta,
            ExpressionType::AssignmentExpression { meta, .. } => meta,
            ExpressionType::SequenceExpression { meta, .. } => meta,
        }
    }
}

impl ExpressionType {
    /// Reinterpret an expression as an assignment target.
    pub fn into_pattern(self) -> Result<PatternType, ExpressionType> {
        match self {
            ExpressionType::Identifier(data) => Ok(PatternType::Identifier(data)),
            ExpressionType::MemberExpression {
                meta,
                object,
                mut accessors,
            } => match accessors.pop() {
                Some(Accessor::Member(property)) => Ok(PatternType::Member {
                    object,
                    accessors,
                    property,
                    meta,
                }),
                Some(call) => {
                    accessors.push(call);
                    Err(ExpressionType::MemberExpression {
                        meta,
                        object,
                        accessors,
                    })
                }
                None => Err(ExpressionType::MemberExpression {
                    meta,
                    object,
                    accessors,
                }),
            },
            other => Err(other),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub struct VariableDeclaratorData {
    pub id: IdentifierData,
    pub init: Option<ExpressionType>,
}

#[derive(Debug)]
pub struct VariableDeclarationData {
    pub meta: Meta,
    pub kind: VariableDeclarationKind,
    pub declarations: Vec<VariableDeclaratorData>,
}

#[derive(Debug)]
pub struct BlockStatementData {
    pub meta: Meta,
    pub body: Vec<StatementType>,
}

#[derive(Debug)]
pub enum ForInit {
    VariableDeclaration(VariableDeclarationData),
    Expression(ExpressionType),
}

#[derive(Debug)]
pub enum ForIteratorLeft {
    Binding {
        kind: VariableDeclarationKind,
        id: IdentifierData,
    },
    Pattern(PatternType),
}

#[derive(Debug)]
pub struct ForIteratorData {
    pub meta: Meta,
    pub left: ForIteratorLeft,
    pub right: ExpressionType,
    pub body: Box<StatementType>,
}

#[derive(Debug)]
pub struct SwitchCaseData {
    pub meta: Meta,
    /// `None` for the `default` clause.
    pub test: Option<ExpressionType>,
    pub consequent: Vec<StatementType>,
}

#[derive(Debug)]
pub struct CatchClauseData {
    pub meta: Meta,
    pub param: Option<IdentifierData>,
    pub body: BlockStatementData,
}

#[derive(Debug)]
pub enum StatementType {
    EmptyStatement {
        meta: Meta,
    },
    ExpressionStatement {
        meta: Meta,
        expression: ExpressionType,
    },
    BlockStatement(BlockStatementData),
    VariableDeclaration(VariableDeclarationData),
    IfStatement {
        meta: Meta,
        test: ExpressionType,
        consequent: Box<StatementType>,
        alternate: Option<Box<StatementType>>,
    },
    WhileStatement {
        meta: Meta,
        test: ExpressionType,
        body: Box<StatementType>,
    },
    DoWhileStatement {
        meta: Meta,
        body: Box<StatementType>,
        test: ExpressionType,
    },
    ForStatement {
        meta: Meta,
        init: Option<ForInit>,
        test: Option<ExpressionType>,
        update: Option<ExpressionType>,
        body: Box<StatementType>,
    },
    ForInStatement(ForIteratorData),
    ForOfStatement(ForIteratorData),
    SwitchStatement {
        meta: Meta,
        discriminant: ExpressionType,
        cases: Vec<SwitchCaseData>,
    },
    BreakStatement {
        meta: Meta,
    },
    ContinueStatement {
        meta: Meta,
    },
    ReturnStatement {
        meta: Meta,
        argument: Option<ExpressionType>,
    },
    ThrowStatement {
        meta: Meta,
        argument: ExpressionType,
    },
    TryStatement {
        meta: Meta,
        block: BlockStatementData,
        handler: Option<CatchClauseData>,
        finalizer: Option<BlockStatementData>,
    },
}

impl HasMeta for StatementType {
    fn get_meta(&self) -> &Meta {
        match self {
            StatementType::EmptyStatement { meta } => meta,
            StatementType::ExpressionStatement { meta, .. } => meta,
            StatementType::BlockStatement(data) => &data.meta,
            StatementType::VariableDeclaration(data) => &data.meta,
            StatementType::IfStatement { meta, .. } => meta,
            StatementType::WhileStatement { meta, .. } => meta,
            StatementType::DoWhileStatement { meta, .. } => meta,
            StatementType::ForStatement { meta, .. } => meta,
            StatementType::ForInStatement(data) => &data.meta,
            StatementType::ForOfStatement(data) => &data.meta,
            StatementType::SwitchStatement { meta, .. } => meta,
            StatementType::BreakStatement { meta } => meta,
            StatementType::ContinueStatement { meta } => meta,
            StatementType::ReturnStatement { meta, .. } => meta,
            StatementType::ThrowStatement { meta, .. } => meta,
            StatementType::TryStatement { meta, .. } => meta,
        }
    }
}
