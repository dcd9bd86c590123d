//! Abstract Syntax Tree for the Cinder language.
//!
//! The tree is produced by an external front-end and consumed by the bytecode
//! compiler. Operators are kept as the strings the front-end saw so that an
//! operator the compiler does not know can still be reported by name.

// ───────────────────────────── Program ─────────────────────────────

/// A whole source fragment: the unit handed to the compiler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

/// A `{ ... }` block. Only appears as a branch of a conditional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl BlockStatement {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

// ──────────────────────────── Statements ───────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let <name> = <value>;`
    Let { name: String, value: Expression },

    /// An expression whose value is discarded: `1 + 2;`
    Expression(Expression),
}

// ─────────────────────────── Expressions ───────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal: `5`
    Integer(i64),

    /// Boolean literal: `true`, `false`
    Boolean(bool),

    /// Reference to a let-bound name: `x`
    Identifier(String),

    /// `<operator><right>`, e.g. `-5`, `!true`
    Prefix {
        operator: String,
        right: Box<Expression>,
    },

    /// `<left> <operator> <right>`, e.g. `1 + 2`, `a < b`
    Infix {
        left: Box<Expression>,
        operator: String,
        right: Box<Expression>,
    },

    /// `if (<condition>) { ... } else { ... }`
    ///
    /// A conditional is itself an expression: it evaluates to the value of the
    /// last expression in whichever branch runs.
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
}

/// Any node the compiler can be asked to compile.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Program(&'a Program),
    Block(&'a BlockStatement),
    Statement(&'a Statement),
    Expression(&'a Expression),
}

impl<'a> From<&'a Program> for Node<'a> {
    fn from(program: &'a Program) -> Self {
        Node::Program(program)
    }
}

impl<'a> From<&'a BlockStatement> for Node<'a> {
    fn from(block: &'a BlockStatement) -> Self {
        Node::Block(block)
    }
}

impl<'a> From<&'a Statement> for Node<'a> {
    fn from(statement: &'a Statement) -> Self {
        Node::Statement(statement)
    }
}

impl<'a> From<&'a Expression> for Node<'a> {
    fn from(expression: &'a Expression) -> Self {
        Node::Expression(expression)
    }
}

// ────────────────────────── Constructors ───────────────────────────
//
// Shorthands for building trees by hand (tests, the CLI demo).

pub fn int(n: i64) -> Expression {
    Expression::Integer(n)
}

pub fn boolean(b: bool) -> Expression {
    Expression::Boolean(b)
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

pub fn prefix(operator: &str, right: Expression) -> Expression {
    Expression::Prefix {
        operator: operator.to_string(),
        right: Box::new(right),
    }
}

pub fn infix(left: Expression, operator: &str, right: Expression) -> Expression {
    Expression::Infix {
        left: Box::new(left),
        operator: operator.to_string(),
        right: Box::new(right),
    }
}

pub fn if_else(
    condition: Expression,
    consequence: Vec<Statement>,
    alternative: Option<Vec<Statement>>,
) -> Expression {
    Expression::If {
        condition: Box::new(condition),
        consequence: BlockStatement::new(consequence),
        alternative: alternative.map(BlockStatement::new),
    }
}

pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(expression)
}

pub fn let_stmt(name: &str, value: Expression) -> Statement {
    Statement::Let {
        name: name.to_string(),
        value,
    }
}

/// A program made of one expression statement per expression.
pub fn program_of(expressions: Vec<Expression>) -> Program {
    Program::new(expressions.into_iter().map(expr_stmt).collect())
}
