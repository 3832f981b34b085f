use std::fmt;
use std::rc::Rc;

use crate::lang::token::Position;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `++`, only on identifiers
    Increment,
    /// `--`, only on identifiers
    Decrement,
}

impl UnaryOp {
    pub fn op_str(&self) -> &str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `//`
    IntDivide,
    /// `%`
    Modulo,
    /// `**`
    Power,
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `|`
    BitOr,
    /// `&`
    BitAnd,
    /// `^`
    BitXor,
    /// `<<`
    LeftShift,
    /// `>>`
    RightShift,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEquals,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEquals,
}

impl BinaryOp {
    pub fn op_str(&self) -> &str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntDivide => "//",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::BitOr => "|",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanEquals => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanEquals => ">=",
        }
    }
}

/// `=` or one of the compound forms, eg. `+=` is `Compound(BinaryOp::Plus)`
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Constant {
    Null,
    Integer(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, PartialEq, Hash, PartialOrd, Ord, Eq, Clone)]
pub struct Identifier(pub String);

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CollectionKind {
    List,
    Set,
    Tuple,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDef {
    pub params: Vec<Identifier>,
    pub body: Block,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Constant),
    Identifier(Identifier),
    Unary(UnaryOp, Box<Expression>),
    /// `x++` / `x--`; the operand is always an identifier
    Postfix(UnaryOp, Identifier),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    /// (target, operator, value)
    Assignment(Identifier, AssignOp, Box<Expression>),
    /// (condition, true_value, false_value)
    Ternary(Box<Expression>, Box<Expression>, Box<Expression>),
    /// (function, arguments)
    Call(Box<Expression>, Vec<Expression>),
    /// (collection, index)
    Index(Box<Expression>, Box<Expression>),
    /// (collection, start, stop)
    Slice(
        Box<Expression>,
        Option<Box<Expression>>,
        Option<Box<Expression>>,
    ),
    Collection(CollectionKind, Vec<Expression>),
    /// Function literal. Shared so closures can outlive the program that defined them
    Function(Rc<FunctionDef>),
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum StatementKind {
    Expression(Expression),
    Block(Block),
    /// (condition, true_body, false_body)
    If(Expression, Box<Statement>, Option<Box<Statement>>),
    /// (condition, body)
    While(Expression, Box<Statement>),
    /// (ident, iterable, body)
    For(Identifier, Expression, Box<Statement>),
    Break,
    Continue,
    Return(Option<Expression>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    /// Position of the first token of the statement
    pub pos: Position,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}
