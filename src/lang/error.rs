use thiserror::Error;

use crate::lang::token::Position;

/// Malformed token or grammar violation
#[derive(Debug, Clone, PartialEq, Error)]
#[error("SyntaxError at {pos}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub pos: Position,
}

impl SyntaxError {
    pub fn new<S: Into<String>>(message: S, pos: Position) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

/// Kinds of errors raised while evaluating a program
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("NameError: name '{0}' is not defined")]
    Name(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ZeroDivisionError: {0}")]
    ZeroDivision(String),
    #[error("IndexError: {0}")]
    Index(String),
    #[error("KeyError: {0}")]
    Key(String),
    #[error("RecursionError: maximum recursion depth of {0} exceeded")]
    Recursion(usize),
    #[error("OverflowError: {0}")]
    Overflow(String),
    #[error("ValueError: {0}")]
    Value(String),
}

/// Error raised during evaluation
///
/// `pos` is the position of the innermost statement that was executing when the error was raised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{}", .kind, at_suffix(.pos))]
pub struct RuntimeError {
    #[source]
    pub kind: ErrorKind,
    pub pos: Option<Position>,
}

fn at_suffix(pos: &Option<Position>) -> String {
    match pos {
        Some(pos) => format!(" (at {})", pos),
        None => String::new(),
    }
}

impl RuntimeError {
    /// Attach `pos` unless a more precise position is already known
    pub fn at(mut self, pos: Position) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos);
        }

        self
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, pos: None }
    }
}

/// Either kind of error, as returned by `Runtime::eval`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Shorthand for building a `TypeError`
pub fn type_error<T, S: Into<String>>(message: S) -> Result<T> {
    Err(ErrorKind::Type(message.into()).into())
}

#[test]
fn test_error_display() {
    let err = SyntaxError::new("unexpected `)`", Position::new(2, 5, 14));
    assert_eq!(err.to_string(), "SyntaxError at 2:5: unexpected `)`");

    let err = RuntimeError::from(ErrorKind::Name("foo".to_string()));
    assert_eq!(err.to_string(), "NameError: name 'foo' is not defined");

    let err = err.at(Position::new(3, 1, 20)).at(Position::new(1, 1, 0));
    assert_eq!(err.pos, Some(Position::new(3, 1, 20)));
    assert_eq!(
        err.to_string(),
        "NameError: name 'foo' is not defined (at 3:1)"
    );

    use std::error::Error as _;
    let source = err.source().map(|e| e.to_string());
    assert_eq!(source.as_deref(), Some("NameError: name 'foo' is not defined"));
}
