//! nssm is a small duck-typed scripting language.
//!
//! Source text goes through three stages: `lang::lex` turns it into tokens, `lang::parse` builds
//! a `Program` out of those (rejecting misplaced `break`/`return` on the way) and `lang::eval`
//! walks the tree against an `Environment`.
//!
//! ```
//! let program = nssm::parse("add = (a, b) { a + b }\nadd(2, 3)").unwrap();
//! let (val, env) = nssm::evaluate(&program, vec![]).unwrap();
//!
//! assert_eq!(val, nssm::Value::Integer(5));
//! assert!(env.get("add").is_some());
//! ```

pub mod lang;

pub use lang::ast::Program;
pub use lang::error::{Error, ErrorKind, RuntimeError, SyntaxError};
pub use lang::eval::{Function, Value};
pub use lang::parse::{parse, parse_with};
pub use lang::runtime::{Config, Runtime};
pub use lang::token::Position;
pub use lang::variables::Environment;

use lang::eval::Eval;

/// Evaluate `program` in a fresh global environment holding the builtins and `bindings`
///
/// Returns the value of the last top level statement (null for an empty program) together with
/// the global environment, so callers can inspect what the program bound.
pub fn evaluate<I>(program: &Program, bindings: I) -> Result<(Value, Environment), RuntimeError>
where
    I: IntoIterator<Item = (String, Value)>,
{
    evaluate_with(program, bindings, &Config::default())
}

/// Like `evaluate`, with explicit evaluation limits
pub fn evaluate_with<I>(
    program: &Program,
    bindings: I,
    config: &Config,
) -> Result<(Value, Environment), RuntimeError>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let env = Environment::global(bindings);
    let val = Eval::new(config).eval(program, &env)?;

    Ok((val, env))
}

#[test]
fn test_evaluate() {
    let program = parse("x = 5\nx += 3\nx == x + 0").unwrap();
    let (val, env) = evaluate(&program, vec![]).unwrap();

    assert_eq!(val, Value::Integer(1));
    assert_eq!(env.get("x"), Some(Value::Integer(8)));
}

#[test]
fn test_evaluate_bindings() {
    let program = parse("limit * 2").unwrap();
    let bindings = vec![("limit".to_string(), Value::Integer(21))];
    let (val, _) = evaluate(&program, bindings).unwrap();

    assert_eq!(val, Value::Integer(42));

    let err = evaluate(&program, vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Name("limit".to_string()));
    assert_eq!(err.pos, Some(Position::new(1, 1, 0)));
}

#[test]
fn test_evaluate_with() {
    let program = parse("{ { { 1 } } }").unwrap();
    let shallow = Config {
        max_depth: 2,
        ..Config::default()
    };

    assert_eq!(
        evaluate_with(&program, vec![], &shallow).unwrap_err().kind,
        ErrorKind::Recursion(2)
    );
    assert_eq!(evaluate(&program, vec![]).unwrap().0, Value::Integer(1));
}

#[test]
fn test_empty_program() {
    let program = parse("\n# nothing here\n").unwrap();
    assert_eq!(program, Program::default());
    assert_eq!(evaluate(&program, vec![]).unwrap().0, Value::Null);
}
