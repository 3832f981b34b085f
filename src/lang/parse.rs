//! This module implements the grammar of the language.
//!
//! The grammar is written as a PEG (https://en.wikipedia.org/wiki/Parsing_expression_grammar)
//! with `pom` combinators running over the token stream produced by `lex`. If you're not familiar
//! with PEGs, you can think of it as a formalization for the very pragmatic recursive descent
//! parser.
//!
//! Developer notes:
//!
//! * A PEG is order sensitive. Alternatives are tried left to right and the first match wins, so
//!   a rule that is a prefix of another (eg. grouping vs function literal, both starting with
//!   `(`) must come after it.
//!
//! * PEGs may not have left recursion (left recursion manifests as an infinite loop that
//!   eventually blows the stack). For example, this rule is not valid:
//!
//!     expr <- expr '*' expr
//!
//!   because PEGs are greedy and always try to take the first match.
//!
//! * Operator precedence is a "precedence ladder": lower precedence operations are "higher up"
//!   on the parser so they bind later than the higher precedence operators. Left associative
//!   levels parse `operand (op operand)*` and fold left; right associative levels (assignment,
//!   ternary, `**`, prefix operators) recurse into themselves on the right.
//!
//! * Backtracking swallows the errors of abandoned alternatives, so the error pom returns is
//!   rarely useful. Every token matcher records the furthest position it failed at and what it
//!   expected there; that is what gets reported.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;
use pom::parser::{call, list, Parser};

use crate::lang::ast::*;
use crate::lang::error::SyntaxError;
use crate::lang::lex::{tokenize, tokenize_with};
use crate::lang::semantics::check;
use crate::lang::token::{Keyword, Position, Punct, Token, TokenKind};

type P<'a, O> = Parser<'a, Token, O>;

#[derive(Debug, PartialEq, Clone, Copy)]
enum Expected {
    Punct(Punct),
    Keyword(Keyword),
    Named(&'static str),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Punct(p) => write!(f, "`{}`", p.as_str()),
            Expected::Keyword(k) => write!(f, "`{}`", k.as_str()),
            Expected::Named(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Default)]
struct Furthest {
    position: usize,
    expected: Vec<Expected>,
}

thread_local! {
    static FURTHEST: RefCell<Furthest> = RefCell::new(Furthest::default());
}

fn record_failure(position: usize, expected: Expected) {
    FURTHEST.with(|f| {
        let mut f = f.borrow_mut();
        if position > f.position {
            f.position = position;
            f.expected.clear();
        }
        if position == f.position && !f.expected.contains(&expected) {
            f.expected.push(expected);
        }
    });
}

/// Match a single token for which `f` returns `Some`
fn satisfy<'a, O, F>(expected: Expected, f: F) -> P<'a, O>
where
    O: 'a,
    F: Fn(&Token) -> Option<O> + 'a,
{
    Parser::new(move |input: &'a [Token], start: usize| match input.get(start) {
        Some(tok) => match f(tok) {
            Some(out) => Ok((out, start + 1)),
            None => {
                record_failure(start, expected);
                Err(pom::Error::Mismatch {
                    message: format!("expected {}, found {}", expected, tok),
                    position: start,
                })
            }
        },
        None => {
            record_failure(start, expected);
            Err(pom::Error::Incomplete)
        }
    })
}

/// Position of the next token. Consumes nothing
fn position<'a>() -> P<'a, Position> {
    Parser::new(|input: &'a [Token], start: usize| {
        let pos = input.get(start).map(|t| t.pos).unwrap_or_default();
        Ok((pos, start))
    })
}

fn punct<'a>(p: Punct) -> P<'a, ()> {
    satisfy(Expected::Punct(p), move |t| if t.is_punct(p) { Some(()) } else { None })
}

fn keyword<'a>(k: Keyword) -> P<'a, ()> {
    satisfy(Expected::Keyword(k), move |t| if t.is_keyword(k) { Some(()) } else { None })
}

fn ident<'a>() -> P<'a, Identifier> {
    satisfy(Expected::Named("identifier"), |t| match &t.kind {
        TokenKind::Identifier(name) => Some(Identifier(name.clone())),
        _ => None,
    })
}

fn newline<'a>() -> P<'a, ()> {
    satisfy(Expected::Named("newline"), |t| match t.kind {
        TokenKind::Newline => Some(()),
        _ => None,
    })
}

/// Optional line feeds
fn nl<'a>() -> P<'a, ()> {
    newline().repeat(0..).discard()
}

/// Statement separator: `;` or a line feed
fn separator<'a>() -> P<'a, ()> {
    satisfy(Expected::Named("`;` or newline"), |t| match t.kind {
        TokenKind::Newline | TokenKind::Punct(Punct::Semicolon) => Some(()),
        _ => None,
    })
}

fn eof<'a>() -> P<'a, ()> {
    satisfy(Expected::Named("end of input"), |t| match t.kind {
        TokenKind::Eof => Some(()),
        _ => None,
    })
}

fn literal<'a>() -> P<'a, Expression> {
    satisfy(Expected::Named("expression"), |t| {
        let constant = match &t.kind {
            TokenKind::Integer(i) => Constant::Integer(*i),
            TokenKind::Real(r) => Constant::Float(*r),
            TokenKind::Str(s) => Constant::Str(s.clone()),
            TokenKind::Keyword(Keyword::True) => Constant::Integer(1),
            TokenKind::Keyword(Keyword::False) => Constant::Integer(0),
            TokenKind::Keyword(Keyword::Null) => Constant::Null,
            TokenKind::Keyword(Keyword::NaN) => Constant::Float(f64::NAN),
            TokenKind::Keyword(Keyword::Inf) => Constant::Float(f64::INFINITY),
            _ => return None,
        };

        Some(Expression::Literal(constant))
    })
}

/// Comma separated expressions with an optional trailing comma
fn elements<'a>() -> P<'a, Vec<Expression>> {
    let items = call(expression) + (punct(Punct::Comma) * nl() * call(expression)).repeat(0..)
        - punct(Punct::Comma).opt();

    items
        .map(|(first, rest)| {
            let mut items = vec![first];
            items.extend(rest);
            items
        })
        .opt()
        .map(Option::unwrap_or_default)
}

/// `(params) { body }`
fn function_literal<'a>() -> P<'a, Expression> {
    let params = punct(Punct::LParen) * list(ident(), punct(Punct::Comma))
        - punct(Punct::Comma).opt()
        - punct(Punct::RParen);

    (params + call(block)).map(|(params, body)| {
        Expression::Function(Rc::new(FunctionDef { params, body }))
    })
}

/// `(e)` is grouping, `()`, `(e,)` and `(e, f)` are tuples
fn paren_or_tuple<'a>() -> P<'a, Expression> {
    let items = call(expression)
        + (punct(Punct::Comma) * call(expression)).repeat(0..)
        + punct(Punct::Comma).opt();
    let parens = punct(Punct::LParen) * items.opt() - punct(Punct::RParen);

    parens.map(|items| match items {
        None => Expression::Collection(CollectionKind::Tuple, vec![]),
        Some(((first, rest), None)) if rest.is_empty() => first,
        Some(((first, rest), _)) => {
            let mut items = vec![first];
            items.extend(rest);
            Expression::Collection(CollectionKind::Tuple, items)
        }
    })
}

fn list_literal<'a>() -> P<'a, Expression> {
    (punct(Punct::LSquare) * elements() - punct(Punct::RSquare))
        .map(|items| Expression::Collection(CollectionKind::List, items))
}

fn set_literal<'a>() -> P<'a, Expression> {
    (punct(Punct::LBrace) * nl() * elements() - nl() - punct(Punct::RBrace))
        .map(|items| Expression::Collection(CollectionKind::Set, items))
}

fn primary<'a>() -> P<'a, Expression> {
    literal()
        | ident().map(Expression::Identifier)
        | function_literal()
        | paren_or_tuple()
        | list_literal()
        | set_literal()
}

fn update_op<'a>() -> P<'a, UnaryOp> {
    punct(Punct::PlusPlus).map(|_| UnaryOp::Increment)
        | punct(Punct::MinusMinus).map(|_| UnaryOp::Decrement)
}

fn postfix<'a>() -> P<'a, Expression> {
    enum PostfixOp {
        Call(Vec<Expression>),
        Index(Expression),
        Slice(Option<Expression>, Option<Expression>),
    }

    let update = (ident() + update_op()).map(|(ident, op)| Expression::Postfix(op, ident));

    let function_call = (punct(Punct::LParen) * elements() - punct(Punct::RParen)).map(PostfixOp::Call);
    let subscript = (punct(Punct::LSquare) * call(expression).opt()
        + (punct(Punct::Colon) * call(expression).opt()).opt()
        - punct(Punct::RSquare))
    .convert(|(start, stop)| match (start, stop) {
        (Some(index), None) => Ok(PostfixOp::Index(index)),
        (start, Some(stop)) => Ok(PostfixOp::Slice(start, stop)),
        (None, None) => Err("empty subscript"),
    });
    let chain = call(primary) + (function_call | subscript).repeat(0..);

    // NB: postfix operators are left-to-right associativity, so fold-left
    update
        | chain.map(|(primary, ops)| {
            ops.into_iter().fold(primary, |expr, op| match op {
                PostfixOp::Call(args) => Expression::Call(Box::new(expr), args),
                PostfixOp::Index(index) => Expression::Index(Box::new(expr), Box::new(index)),
                PostfixOp::Slice(start, stop) => {
                    Expression::Slice(Box::new(expr), start.map(Box::new), stop.map(Box::new))
                }
            })
        })
}

/// `**` is right associative and binds tighter than a prefix operator on its left, so `-a ** b`
/// is `-(a ** b)`. The exponent may carry its own prefix operator: `2 ** -1`
fn power<'a>() -> P<'a, Expression> {
    (call(postfix) + (punct(Punct::StarStar) * nl() * call(unary)).opt()).map(|(base, exp)| {
        match exp {
            Some(exp) => Expression::Binary(BinaryOp::Power, Box::new(base), Box::new(exp)),
            None => base,
        }
    })
}

fn unary<'a>() -> P<'a, Expression> {
    let op = punct(Punct::Plus).map(|_| UnaryOp::Plus)
        | punct(Punct::Minus).map(|_| UnaryOp::Minus)
        | punct(Punct::Bang).map(|_| UnaryOp::Not)
        | punct(Punct::Tilde).map(|_| UnaryOp::BitNot);

    let update = (update_op() + ident())
        .map(|(op, ident)| Expression::Unary(op, Box::new(Expression::Identifier(ident))));

    // NB: unary expressions are right-to-left associativity, so recurse on the right
    let prefixed = (op + call(unary)).map(|(op, expr)| Expression::Unary(op, Box::new(expr)));

    update | prefixed | call(power)
}

const MULTIPLICATIVE: &[(Punct, BinaryOp)] = &[
    (Punct::Star, BinaryOp::Multiply),
    (Punct::Slash, BinaryOp::Divide),
    (Punct::SlashSlash, BinaryOp::IntDivide),
    (Punct::Percent, BinaryOp::Modulo),
];
const ADDITIVE: &[(Punct, BinaryOp)] = &[
    (Punct::Plus, BinaryOp::Plus),
    (Punct::Minus, BinaryOp::Minus),
];
const SHIFT: &[(Punct, BinaryOp)] = &[
    (Punct::Shl, BinaryOp::LeftShift),
    (Punct::Shr, BinaryOp::RightShift),
];
// NB: unlike a char level PEG, `<=` vs `<` is already settled by the lexer, so order is free
const RELATIONAL: &[(Punct, BinaryOp)] = &[
    (Punct::Lt, BinaryOp::LessThan),
    (Punct::LtEq, BinaryOp::LessThanEquals),
    (Punct::Gt, BinaryOp::GreaterThan),
    (Punct::GtEq, BinaryOp::GreaterThanEquals),
];
const EQUALITY: &[(Punct, BinaryOp)] = &[
    (Punct::EqEq, BinaryOp::Equals),
    (Punct::NotEq, BinaryOp::NotEquals),
];
const BIT_AND: &[(Punct, BinaryOp)] = &[(Punct::Amp, BinaryOp::BitAnd)];
const BIT_XOR: &[(Punct, BinaryOp)] = &[(Punct::Caret, BinaryOp::BitXor)];
const BIT_OR: &[(Punct, BinaryOp)] = &[(Punct::Pipe, BinaryOp::BitOr)];
const LOGICAL_AND: &[(Punct, BinaryOp)] = &[(Punct::AmpAmp, BinaryOp::LogicalAnd)];
const LOGICAL_OR: &[(Punct, BinaryOp)] = &[(Punct::PipePipe, BinaryOp::LogicalOr)];

/// One left associative rung of the ladder: `operand (op operand)*`, folded left
///
/// Left fold creates left-to-right associativity, ie:
///     1 + 2 + 3 + 4 => ((1 + 2) + 3) + 4
fn left_assoc<'a>(
    operand: fn() -> P<'a, Expression>,
    ops: &'static [(Punct, BinaryOp)],
) -> P<'a, Expression> {
    let op = satisfy(Expected::Named("operator"), move |t| {
        ops.iter()
            .find(|(p, _)| t.is_punct(*p))
            .map(|(_, op)| *op)
    });

    // A line feed may follow a binary operator but not precede it
    (call(operand) + (op - nl() + call(operand)).repeat(0..)).map(|(lhs, rest)| {
        rest.into_iter().fold(lhs, |lhs, (op, rhs)| {
            Expression::Binary(op, Box::new(lhs), Box::new(rhs))
        })
    })
}

fn multiplicative<'a>() -> P<'a, Expression> {
    left_assoc(unary, MULTIPLICATIVE)
}

fn additive<'a>() -> P<'a, Expression> {
    left_assoc(multiplicative, ADDITIVE)
}

fn shift<'a>() -> P<'a, Expression> {
    left_assoc(additive, SHIFT)
}

fn relational<'a>() -> P<'a, Expression> {
    left_assoc(shift, RELATIONAL)
}

fn equality<'a>() -> P<'a, Expression> {
    left_assoc(relational, EQUALITY)
}

fn bit_and<'a>() -> P<'a, Expression> {
    left_assoc(equality, BIT_AND)
}

fn bit_xor<'a>() -> P<'a, Expression> {
    left_assoc(bit_and, BIT_XOR)
}

fn bit_or<'a>() -> P<'a, Expression> {
    left_assoc(bit_xor, BIT_OR)
}

fn logical_and<'a>() -> P<'a, Expression> {
    left_assoc(bit_or, LOGICAL_AND)
}

fn logical_or<'a>() -> P<'a, Expression> {
    left_assoc(logical_and, LOGICAL_OR)
}

/// `cond ? a : b`, right associative
fn ternary<'a>() -> P<'a, Expression> {
    let branches = punct(Punct::Question) * nl() * call(expression)
        - nl()
        - punct(Punct::Colon)
        - nl()
        + call(expression);

    (logical_or() + branches.opt()).map(|(cond, branches)| match branches {
        Some((t, f)) => Expression::Ternary(Box::new(cond), Box::new(t), Box::new(f)),
        None => cond,
    })
}

fn assign_op<'a>() -> P<'a, AssignOp> {
    satisfy(Expected::Named("assignment operator"), |t| {
        let op = match t.kind {
            TokenKind::Punct(Punct::Eq) => return Some(AssignOp::Assign),
            TokenKind::Punct(Punct::PlusEq) => BinaryOp::Plus,
            TokenKind::Punct(Punct::MinusEq) => BinaryOp::Minus,
            TokenKind::Punct(Punct::StarEq) => BinaryOp::Multiply,
            TokenKind::Punct(Punct::SlashEq) => BinaryOp::Divide,
            TokenKind::Punct(Punct::SlashSlashEq) => BinaryOp::IntDivide,
            TokenKind::Punct(Punct::PercentEq) => BinaryOp::Modulo,
            TokenKind::Punct(Punct::StarStarEq) => BinaryOp::Power,
            TokenKind::Punct(Punct::ShlEq) => BinaryOp::LeftShift,
            TokenKind::Punct(Punct::ShrEq) => BinaryOp::RightShift,
            TokenKind::Punct(Punct::AmpEq) => BinaryOp::BitAnd,
            TokenKind::Punct(Punct::CaretEq) => BinaryOp::BitXor,
            TokenKind::Punct(Punct::PipeEq) => BinaryOp::BitOr,
            _ => return None,
        };

        Some(AssignOp::Compound(op))
    })
}

/// Assignment only ever has an identifier on the left, and is right associative
fn assignment<'a>() -> P<'a, Expression> {
    (ident() + assign_op() - nl() + call(expression))
        .map(|((target, op), value)| Expression::Assignment(target, op, Box::new(value)))
}

fn expression<'a>() -> P<'a, Expression> {
    assignment() | ternary()
}

fn block<'a>() -> P<'a, Block> {
    (punct(Punct::LBrace) * statements() - punct(Punct::RBrace))
        .map(|statements| Block { statements })
}

/// `( cond )`, optionally followed by line feeds before the body
fn condition<'a>() -> P<'a, Expression> {
    punct(Punct::LParen) * call(expression) - punct(Punct::RParen) - nl()
}

/// Everything after `if` or `elif`
///
/// Dangling `else`s bind to the nearest `if` because the innermost `if` greedily tries to take one
fn if_tail<'a>() -> P<'a, StatementKind> {
    let else_branch = nl() * keyword(Keyword::Else) * nl() * call(statement);
    let elif_branch = (nl() * position() - keyword(Keyword::Elif) + call(if_tail))
        .map(|(pos, kind)| Statement { kind, pos });

    (condition() + call(statement) + (else_branch | elif_branch).opt()).map(
        |((cond, true_body), false_body)| {
            StatementKind::If(cond, Box::new(true_body), false_body.map(Box::new))
        },
    )
}

fn if_stmt<'a>() -> P<'a, StatementKind> {
    keyword(Keyword::If) * if_tail()
}

fn while_stmt<'a>() -> P<'a, StatementKind> {
    (keyword(Keyword::While) * condition() + call(statement))
        .map(|(cond, body)| StatementKind::While(cond, Box::new(body)))
}

fn for_stmt<'a>() -> P<'a, StatementKind> {
    let header = keyword(Keyword::For) * punct(Punct::LParen) * ident() - keyword(Keyword::In)
        + call(expression)
        - punct(Punct::RParen)
        - nl();

    (header + call(statement))
        .map(|((ident, iterable), body)| StatementKind::For(ident, iterable, Box::new(body)))
}

fn jump_stmt<'a>() -> P<'a, StatementKind> {
    keyword(Keyword::Break).map(|_| StatementKind::Break)
        | keyword(Keyword::Continue).map(|_| StatementKind::Continue)
        | (keyword(Keyword::Return) * call(expression).opt()).map(StatementKind::Return)
}

/// Parse a statement
fn statement<'a>() -> P<'a, Statement> {
    // NB: a `{` at the start of a statement opens a block, never a set literal
    let kind = if_stmt()
        | while_stmt()
        | for_stmt()
        | jump_stmt()
        | call(block).map(StatementKind::Block)
        | call(expression).map(StatementKind::Expression);

    (position() + kind).map(|(pos, kind)| Statement { kind, pos })
}

/// Parse a series of separated statements
///
/// Consumes leading and trailing separators
fn statements<'a>() -> P<'a, Vec<Statement>> {
    separator().repeat(0..) * list(call(statement), separator().repeat(1..))
        - separator().repeat(0..)
}

fn program<'a>() -> P<'a, Vec<Statement>> {
    statements() - eof()
}

/// Build the error for a failed parse from the furthest failure recorded
fn syntax_error(tokens: &[Token], err: pom::Error) -> SyntaxError {
    let (position, expected) = FURTHEST.with(|f| {
        let f = f.borrow();
        (f.position, f.expected.clone())
    });

    let found = match tokens.get(position).or_else(|| tokens.last()) {
        Some(tok) => tok,
        None => return SyntaxError::new(err.to_string(), Position::default()),
    };

    let message = match expected.len() {
        0 => format!("unexpected {}", found),
        1..=3 => {
            let expected: Vec<String> = expected.iter().map(|e| e.to_string()).collect();
            format!("expected {}, found {}", expected.join(" or "), found)
        }
        _ => format!("unexpected {}", found),
    };

    SyntaxError::new(message, found.pos)
}

/// Parse a token stream, as produced by `lex::tokenize`, into a program
pub fn parse_tokens(tokens: &[Token]) -> Result<Program, SyntaxError> {
    FURTHEST.with(|f| *f.borrow_mut() = Furthest::default());

    let statements = program()
        .parse(tokens)
        .map_err(|e| syntax_error(tokens, e))?;
    let program = Program { statements };
    check(&program)?;

    debug!("parsed {} top level statements", program.statements.len());

    Ok(program)
}

pub fn parse(input: &str) -> Result<Program, SyntaxError> {
    let tokens = tokenize(input)?;
    parse_tokens(&tokens)
}

/// Like `parse`, with a custom bracket nesting limit. The grammar recurses once per level, so
/// the limit is what keeps hostile input from exhausting the stack.
pub fn parse_with(input: &str, max_nesting: usize) -> Result<Program, SyntaxError> {
    let tokens = tokenize_with(input, max_nesting)?;
    parse_tokens(&tokens)
}

#[cfg(test)]
fn parse_expr(input: &str) -> Expression {
    let mut program = parse(input).unwrap_or_else(|e| panic!("{}: {}", input, e));
    assert_eq!(program.statements.len(), 1, "{}", input);
    match program.statements.remove(0).kind {
        StatementKind::Expression(e) => e,
        k => panic!("{}: not an expression statement: {:?}", input, k),
    }
}

#[cfg(test)]
fn int(i: i64) -> Box<Expression> {
    Box::new(Expression::Literal(Constant::Integer(i)))
}

#[cfg(test)]
fn var(name: &str) -> Box<Expression> {
    Box::new(Expression::Identifier(Identifier(name.to_string())))
}

#[cfg(test)]
fn bin(op: BinaryOp, lhs: Box<Expression>, rhs: Box<Expression>) -> Box<Expression> {
    Box::new(Expression::Binary(op, lhs, rhs))
}

#[test]
fn test_literals() {
    let data = vec![
        ("0b101", Constant::Integer(5)),
        ("0o17", Constant::Integer(15)),
        ("10", Constant::Integer(10)),
        ("0xFF", Constant::Integer(255)),
        ("2.5", Constant::Float(2.5)),
        ("'hi'", Constant::Str("hi".to_string())),
        ("true", Constant::Integer(1)),
        ("false", Constant::Integer(0)),
        ("null", Constant::Null),
        ("INF", Constant::Float(f64::INFINITY)),
    ];

    for (input, expected) in data {
        assert_eq!(parse_expr(input), Expression::Literal(expected));
    }
}

#[test]
fn test_precedence() {
    use BinaryOp::*;

    let data = vec![
        ("1 + 2 * 3", bin(Plus, int(1), bin(Multiply, int(2), int(3)))),
        ("(1 + 2) * 3", bin(Multiply, bin(Plus, int(1), int(2)), int(3))),
        ("1 - 2 - 3", bin(Minus, bin(Minus, int(1), int(2)), int(3))),
        ("2 ** 3 ** 2", bin(Power, int(2), bin(Power, int(3), int(2)))),
        ("a || b && c", bin(LogicalOr, var("a"), bin(LogicalAnd, var("b"), var("c")))),
        ("a | b ^ c & d", bin(BitOr, var("a"), bin(BitXor, var("b"), bin(BitAnd, var("c"), var("d"))))),
        ("a & b == c", bin(BitAnd, var("a"), bin(Equals, var("b"), var("c")))),
        ("a == b < c", bin(Equals, var("a"), bin(LessThan, var("b"), var("c")))),
        ("a < b << c", bin(LessThan, var("a"), bin(LeftShift, var("b"), var("c")))),
        ("a >> b + c", bin(RightShift, var("a"), bin(Plus, var("b"), var("c")))),
        ("a // b % c", bin(Modulo, bin(IntDivide, var("a"), var("b")), var("c"))),
        ("a <= b >= c", bin(GreaterThanEquals, bin(LessThanEquals, var("a"), var("b")), var("c"))),
        ("1 +\n 2", bin(Plus, int(1), int(2))),
    ];

    for (input, expected) in data {
        assert_eq!(parse_expr(input), *expected, "{}", input);
    }
}

#[test]
fn test_unary() {
    use BinaryOp::*;

    assert_eq!(
        parse_expr("-a ** b"),
        Expression::Unary(UnaryOp::Minus, bin(Power, var("a"), var("b")))
    );
    assert_eq!(
        parse_expr("-2 ** 2"),
        Expression::Unary(UnaryOp::Minus, bin(Power, int(2), int(2)))
    );
    assert_eq!(
        parse_expr("2 ** -1"),
        *bin(Power, int(2), int(-1))
    );
    assert_eq!(
        parse_expr("!~x"),
        Expression::Unary(
            UnaryOp::Not,
            Box::new(Expression::Unary(UnaryOp::BitNot, var("x")))
        )
    );
    assert_eq!(
        parse_expr("- -x"),
        Expression::Unary(
            UnaryOp::Minus,
            Box::new(Expression::Unary(UnaryOp::Minus, var("x")))
        )
    );
    assert_eq!(
        parse_expr("++x"),
        Expression::Unary(UnaryOp::Increment, var("x"))
    );
    assert_eq!(
        parse_expr("x--"),
        Expression::Postfix(UnaryOp::Decrement, Identifier("x".to_string()))
    );
    assert_eq!(
        parse_expr("a - -1"),
        *bin(Minus, var("a"), int(-1))
    );
}

#[test]
fn test_assignment() {
    use BinaryOp::*;

    assert_eq!(
        parse_expr("x = y = 3"),
        Expression::Assignment(
            Identifier("x".to_string()),
            AssignOp::Assign,
            Box::new(Expression::Assignment(
                Identifier("y".to_string()),
                AssignOp::Assign,
                int(3)
            ))
        )
    );

    let compound = vec![
        ("+=", Plus),
        ("-=", Minus),
        ("*=", Multiply),
        ("/=", Divide),
        ("//=", IntDivide),
        ("%=", Modulo),
        ("**=", Power),
        ("<<=", LeftShift),
        (">>=", RightShift),
        ("&=", BitAnd),
        ("^=", BitXor),
        ("|=", BitOr),
    ];
    for (op, expected) in compound {
        let input = format!("x {} 2", op);
        assert_eq!(
            parse_expr(&input),
            Expression::Assignment(
                Identifier("x".to_string()),
                AssignOp::Compound(expected),
                int(2)
            )
        );
    }

    for input in vec!["1 = 2", "f() = 2", "x + 1 = 3", "(x) = 1", "x[0] = 1", "++1", "1++"] {
        assert!(parse(input).is_err(), "{}", input);
    }
}

#[test]
fn test_collections() {
    use CollectionKind::*;

    let data = vec![
        ("(1)", *int(1)),
        ("(1,)", Expression::Collection(Tuple, vec![*int(1)])),
        ("(1, 2)", Expression::Collection(Tuple, vec![*int(1), *int(2)])),
        ("()", Expression::Collection(Tuple, vec![])),
        ("[]", Expression::Collection(List, vec![])),
        ("[1, 2,]", Expression::Collection(List, vec![*int(1), *int(2)])),
        ("[1,\n 2]", Expression::Collection(List, vec![*int(1), *int(2)])),
        ("x = {1, 2}", Expression::Assignment(
            Identifier("x".to_string()),
            AssignOp::Assign,
            Box::new(Expression::Collection(Set, vec![*int(1), *int(2)])),
        )),
        ("{1, 2}", Expression::Collection(Set, vec![*int(1), *int(2)])),
    ];

    for (input, expected) in data {
        assert_eq!(parse_expr(input), expected, "{}", input);
    }
}

#[test]
fn test_postfix() {
    assert_eq!(
        parse_expr("f(1, x)[0][1:][:2][:]"),
        Expression::Slice(
            Box::new(Expression::Slice(
                Box::new(Expression::Slice(
                    Box::new(Expression::Index(
                        Box::new(Expression::Call(var("f"), vec![*int(1), *var("x")])),
                        int(0)
                    )),
                    Some(int(1)),
                    None
                )),
                None,
                Some(int(2))
            )),
            None,
            None
        )
    );
    assert!(parse("x[]").is_err());
}

#[test]
fn test_function_literal() {
    let expr = parse_expr("(a, b) { a + b }");
    let def = match expr {
        Expression::Function(def) => def,
        e => panic!("not a function: {:?}", e),
    };

    assert_eq!(
        def.params,
        vec![Identifier("a".to_string()), Identifier("b".to_string())]
    );
    assert_eq!(def.body.statements.len(), 1);
    assert_eq!(
        def.body.statements[0].kind,
        StatementKind::Expression(*bin(BinaryOp::Plus, var("a"), var("b")))
    );

    // Called right away
    assert!(matches!(parse_expr("() { 1 }()"), Expression::Call(_, _)));
    // Lambdas need braces
    assert!(parse("(x) x + 1").is_err());
}

#[test]
fn test_statements() {
    let program = parse("x = 1; y = 2\n\n{ z = 3\n w = 4 }\n").unwrap();
    assert_eq!(program.statements.len(), 3);
    assert!(matches!(&program.statements[2].kind, StatementKind::Block(b) if b.statements.len() == 2));
    assert_eq!(program.statements[2].pos, Position::new(3, 1, 14));

    assert_eq!(parse("").unwrap(), Program::default());
    assert_eq!(parse("\n;\n").unwrap(), Program::default());
    assert!(parse("x y").is_err());
}

#[test]
fn test_if_else() {
    let program = parse("if (a) if (b) x = 1 else x = 2").unwrap();
    let (inner, outer_else) = match &program.statements[0].kind {
        StatementKind::If(_, inner, outer_else) => (inner, outer_else),
        k => panic!("not an if: {:?}", k),
    };

    // Dangling else binds to the nearest if
    assert!(outer_else.is_none());
    assert!(matches!(&inner.kind, StatementKind::If(_, _, Some(_))));

    let program = parse("if (a) {\n x\n}\nelif (b) {\n y\n}\nelse {\n z\n}").unwrap();
    assert_eq!(program.statements.len(), 1);
    match &program.statements[0].kind {
        StatementKind::If(_, _, Some(elif)) => {
            assert!(matches!(&elif.kind, StatementKind::If(_, _, Some(_))))
        }
        k => panic!("bad if: {:?}", k),
    }
}

#[test]
fn test_loops() {
    let program = parse("while (x < 5) {\n x += 1\n if (x == 3) break\n}").unwrap();
    assert!(matches!(&program.statements[0].kind, StatementKind::While(_, _)));

    let program = parse("for (i in [1, 2]) continue").unwrap();
    assert!(matches!(&program.statements[0].kind, StatementKind::For(Identifier(i), _, _) if i == "i"));
}

#[test]
fn test_identifiers_are_not_resolved() {
    // Binding happens at run time, any well formed identifier parses
    assert_eq!(parse_expr("undefinedName"), *var("undefinedName"));
}

#[test]
fn test_syntax_errors() {
    let data = vec![
        ("if x", Position::new(1, 4, 3), "expected `(`, found `x`"),
        ("x = (1 + 2", Position::new(1, 11, 10), "unexpected end of input"),
        ("a = 1\nb = = 2", Position::new(2, 5, 10), "unexpected `=`"),
        ("break", Position::new(1, 1, 0), "`break` outside of a loop"),
        ("return 1", Position::new(1, 1, 0), "`return` outside of a function"),
    ];

    for (input, pos, message) in data {
        let err = parse(input).unwrap_err();
        assert_eq!(err.pos, pos, "{}", input);
        assert_eq!(err.message, message, "{}", input);
    }
}

#[test]
fn test_nesting_limit() {
    use crate::lang::lex::DEFAULT_MAX_NESTING;

    let nested = |n: usize| format!("x = {}1{}", "(".repeat(n), ")".repeat(n));

    // Deep nesting is rejected before the grammar recurses into it
    let err = parse(&nested(5000)).unwrap_err();
    assert_eq!(err.message, format!("too many nested brackets (limit {})", DEFAULT_MAX_NESTING));
    assert!(parse_with(&nested(10), 8).is_err());
    assert_eq!(parse_with(&nested(8), 8).unwrap().statements.len(), 1);

    // The full default depth parses, on a stack the size of a main thread
    let handle = std::thread::Builder::new()
        .stack_size(8 << 20)
        .spawn(move || parse(&nested(DEFAULT_MAX_NESTING)).is_ok())
        .unwrap();
    assert!(handle.join().unwrap());
}
