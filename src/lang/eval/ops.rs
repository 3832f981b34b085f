//! Operator dispatch on the runtime kinds of the operands.
//!
//! Every operator is a match over the pair of operand kinds; anything not listed is a TypeError.
//! Integers are 64-bit and checked: a result that does not fit is an OverflowError.

use std::cmp::Ordering;
use std::convert::TryFrom;

use super::value::{Set, Value};
use crate::lang::ast::{BinaryOp, UnaryOp};
use crate::lang::error::{type_error, ErrorKind, Result, RuntimeError};

/// Longest sequence `*` may build
const MAX_REPEAT_LEN: usize = 1 << 28;

/// Deepest nesting of lists and tuples `<` and friends will look into
const MAX_COMPARE_DEPTH: usize = 256;

fn zero_division<T>(message: &str) -> Result<T> {
    Err(ErrorKind::ZeroDivision(message.to_string()).into())
}

fn overflow(message: String) -> RuntimeError {
    ErrorKind::Overflow(message).into()
}

fn unsupported<T>(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<T> {
    type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.op_str(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn as_f64(val: &Value) -> Option<f64> {
    match val {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Evaluate a binary operator on already evaluated operands
///
/// `&&` and `||` are handled here without short-circuiting; the evaluator short-circuits before
/// getting this far.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match op {
        BinaryOp::Plus
        | BinaryOp::Minus
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::IntDivide
        | BinaryOp::Modulo
        | BinaryOp::Power => arithmetic(op, lhs, rhs),
        BinaryOp::BitOr | BinaryOp::BitAnd | BinaryOp::BitXor => bitwise(op, lhs, rhs),
        BinaryOp::LeftShift | BinaryOp::RightShift => shift(op, lhs, rhs),
        BinaryOp::Equals => Ok(Value::from(lhs == rhs)),
        BinaryOp::NotEquals => Ok(Value::from(lhs != rhs)),
        BinaryOp::LessThan
        | BinaryOp::LessThanEquals
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanEquals => {
            let ord = compare(lhs, rhs)?;
            let res = match (op, ord) {
                // Comparisons involving NaN are all false
                (_, None) => false,
                (BinaryOp::LessThan, Some(o)) => o == Ordering::Less,
                (BinaryOp::LessThanEquals, Some(o)) => o != Ordering::Greater,
                (BinaryOp::GreaterThan, Some(o)) => o == Ordering::Greater,
                (_, Some(o)) => o != Ordering::Less,
            };

            Ok(Value::from(res))
        }
        BinaryOp::LogicalAnd => Ok(if lhs.is_truthy() { rhs.clone() } else { lhs.clone() }),
        BinaryOp::LogicalOr => Ok(if lhs.is_truthy() { lhs.clone() } else { rhs.clone() }),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => int_arithmetic(op, *a, *b),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (as_f64(lhs), as_f64(rhs)) {
                (Some(a), Some(b)) => float_arithmetic(op, a, b),
                _ => unsupported(op, lhs, rhs),
            }
        }
        _ => sequence_arithmetic(op, lhs, rhs),
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    let res = match op {
        BinaryOp::Plus => a.checked_add(b),
        BinaryOp::Minus => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => {
            if b == 0 {
                return zero_division("division by zero");
            }

            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinaryOp::IntDivide => {
            if b == 0 {
                return zero_division("integer division by zero");
            }

            // Round toward negative infinity
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Modulo => {
            if b == 0 {
                return zero_division("integer modulo by zero");
            }

            // Result takes the sign of the divisor
            let r = a.wrapping_rem(b);
            Some(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        BinaryOp::Power => return int_power(a, b),
        _ => return unsupported(op, &Value::Integer(a), &Value::Integer(b)),
    };

    res.map(Value::Integer)
        .ok_or_else(|| overflow(format!("{} {} {} overflows", a, op.op_str(), b)))
}

fn int_power(base: i64, exp: i64) -> Result<Value> {
    if exp < 0 {
        if base == 0 {
            return zero_division("0 cannot be raised to a negative power");
        }

        return Ok(Value::Float((base as f64).powf(exp as f64)));
    }

    let res = match base {
        0 if exp == 0 => Some(1),
        0 | 1 => Some(base),
        -1 => Some(if exp % 2 == 0 { 1 } else { -1 }),
        _ => u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)),
    };

    res.map(Value::Integer)
        .ok_or_else(|| overflow(format!("{} ** {} overflows", base, exp)))
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let res = match op {
        BinaryOp::Plus => a + b,
        BinaryOp::Minus => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => {
            if b == 0.0 {
                return zero_division("float division by zero");
            }
            a / b
        }
        BinaryOp::IntDivide => {
            if b == 0.0 {
                return zero_division("float floor division by zero");
            }
            (a / b).floor()
        }
        BinaryOp::Modulo => {
            if b == 0.0 {
                return zero_division("float modulo by zero");
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Power => {
            if a == 0.0 && b < 0.0 {
                return zero_division("0.0 cannot be raised to a negative power");
            }
            a.powf(b)
        }
        _ => return unsupported(op, &Value::Float(a), &Value::Float(b)),
    };

    Ok(Value::Float(res))
}

fn repeat(seq: &Value, times: i64) -> Result<Value> {
    let times = usize::try_from(times).unwrap_or(0);
    let len = match seq {
        Value::String(s) => s.len(),
        Value::List(l) => l.borrow().len(),
        Value::Tuple(t) => t.len(),
        v => {
            return type_error(format!(
                "can't multiply sequence of type '{}'",
                v.type_name()
            ))
        }
    };
    if len.checked_mul(times).map_or(true, |n| n > MAX_REPEAT_LEN) {
        return Err(overflow("repeated sequence is too long".to_string()));
    }

    Ok(match seq {
        Value::String(s) => Value::String(s.repeat(times)),
        Value::List(l) => Value::list(repeat_items(&l.borrow(), times)),
        Value::Tuple(t) => Value::tuple(repeat_items(t, times)),
        _ => Value::Null,
    })
}

fn repeat_items(items: &[Value], times: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        out.extend_from_slice(items);
    }

    out
}

fn sequence_arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (op, lhs, rhs) {
        (BinaryOp::Plus, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (BinaryOp::Plus, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Plus, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            Ok(Value::tuple(items))
        }
        (BinaryOp::Multiply, Value::String(_) | Value::List(_) | Value::Tuple(_), Value::Integer(n))
        | (BinaryOp::Multiply, Value::Integer(n), Value::String(_) | Value::List(_) | Value::Tuple(_)) => {
            let seq = if let Value::Integer(_) = lhs { rhs } else { lhs };
            repeat(seq, *n)
        }
        (BinaryOp::Minus, Value::Set(a), Value::Set(b)) => {
            let res = a.borrow().difference(&b.borrow());
            Ok(Value::set(res))
        }
        _ => unsupported(op, lhs, rhs),
    }
}

fn bitwise(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(match op {
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            _ => a ^ b,
        })),
        (Value::Set(a), Value::Set(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            let res: Set = match op {
                BinaryOp::BitAnd => a.intersection(&b),
                BinaryOp::BitOr => a.union(&b),
                _ => a.symmetric_difference(&b),
            };

            Ok(Value::set(res))
        }
        _ => unsupported(op, lhs, rhs),
    }
}

fn shift(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    let (a, b) = match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => (*a, *b),
        _ => return unsupported(op, lhs, rhs),
    };
    if b < 0 {
        return Err(ErrorKind::Value("negative shift count".to_string()).into());
    }

    let res = match op {
        BinaryOp::LeftShift => {
            if a == 0 {
                0
            } else if b >= 64 || (a << b) >> b != a {
                return Err(overflow(format!("{} << {} overflows", a, b)));
            } else {
                a << b
            }
        }
        _ => {
            if b >= 64 {
                if a < 0 {
                    -1
                } else {
                    0
                }
            } else {
                a >> b
            }
        }
    };

    Ok(Value::Integer(res))
}

/// Order two values for `<` and friends. `None` means unordered (NaN)
pub fn compare(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>> {
    compare_nested(lhs, rhs, 0)
}

/// `depth` counts the sequences being compared further up, which bounds the walk into lists
/// that contain themselves
fn compare_nested(lhs: &Value, rhs: &Value, depth: usize) -> Result<Option<Ordering>> {
    if depth > MAX_COMPARE_DEPTH {
        return Err(ErrorKind::Recursion(MAX_COMPARE_DEPTH).into());
    }

    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (as_f64(lhs), as_f64(rhs)) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Ok(None),
            }
        }
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => compare_sequences(&a.borrow(), &b.borrow(), depth),
        (Value::Tuple(a), Value::Tuple(b)) => compare_sequences(a, b, depth),
        _ => type_error(format!(
            "cannot order '{}' and '{}'",
            lhs.type_name(),
            rhs.type_name()
        )),
    }
}

fn compare_sequences(a: &[Value], b: &[Value], depth: usize) -> Result<Option<Ordering>> {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return compare_nested(x, y, depth + 1);
        }
    }

    Ok(Some(a.len().cmp(&b.len())))
}

/// Evaluate a prefix operator other than `++`/`--`
pub fn unary(op: UnaryOp, val: &Value) -> Result<Value> {
    match (op, val) {
        (UnaryOp::Not, v) => Ok(Value::from(!v.is_truthy())),
        (UnaryOp::Plus, Value::Integer(_) | Value::Float(_)) => Ok(val.clone()),
        (UnaryOp::Minus, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow(format!("-({}) overflows", i))),
        (UnaryOp::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::BitNot, Value::Integer(i)) => Ok(Value::Integer(!i)),
        (op, v) => type_error(format!(
            "bad operand type for unary {}: '{}'",
            op.op_str(),
            v.type_name()
        )),
    }
}

/// `++`/`--`: the value one step up or down
pub fn step(op: UnaryOp, val: &Value) -> Result<Value> {
    let delta = match op {
        UnaryOp::Increment => 1,
        _ => -1,
    };

    match val {
        Value::Integer(i) => i
            .checked_add(delta)
            .map(Value::Integer)
            .ok_or_else(|| overflow(format!("{}{} overflows", i, op.op_str()))),
        Value::Float(f) => Ok(Value::Float(f + delta as f64)),
        v => type_error(format!(
            "bad operand type for {}: '{}'",
            op.op_str(),
            v.type_name()
        )),
    }
}

fn subscriptable(collection: &Value) -> Result<()> {
    match collection {
        Value::List(_) | Value::Tuple(_) | Value::String(_) => Ok(()),
        v => type_error(format!("'{}' object is not subscriptable", v.type_name())),
    }
}

fn index_position(index: &Value, len: usize) -> Result<usize> {
    let i = match index {
        Value::Integer(i) => *i,
        v => {
            return type_error(format!(
                "indices must be integers, not '{}'",
                v.type_name()
            ))
        }
    };

    match usize::try_from(i) {
        Ok(pos) if pos < len => Ok(pos),
        Ok(_) => Err(ErrorKind::Index(format!("index {} out of range for length {}", i, len)).into()),
        Err(_) => Err(ErrorKind::Index(format!("negative index {} is not supported", i)).into()),
    }
}

/// `collection[index]`
pub fn index(collection: &Value, index: &Value) -> Result<Value> {
    subscriptable(collection)?;

    match collection {
        Value::List(l) => {
            let l = l.borrow();
            Ok(l[index_position(index, l.len())?].clone())
        }
        Value::Tuple(t) => Ok(t[index_position(index, t.len())?].clone()),
        Value::String(s) => {
            let len = s.chars().count();
            let pos = index_position(index, len)?;
            Ok(Value::String(
                s.chars().nth(pos).map(String::from).unwrap_or_default(),
            ))
        }
        _ => Ok(Value::Null),
    }
}

fn slice_bound(bound: Option<&Value>, default: usize, len: usize) -> Result<usize> {
    match bound {
        None => Ok(default),
        Some(Value::Integer(i)) => match usize::try_from(*i) {
            Ok(pos) => Ok(pos.min(len)),
            Err(_) => Err(ErrorKind::Index(format!("negative slice bound {} is not supported", i)).into()),
        },
        Some(v) => type_error(format!(
            "slice indices must be integers, not '{}'",
            v.type_name()
        )),
    }
}

/// `collection[start:stop]`
pub fn slice(collection: &Value, start: Option<&Value>, stop: Option<&Value>) -> Result<Value> {
    subscriptable(collection)?;

    let bounds = |len: usize| -> Result<(usize, usize)> {
        let start = slice_bound(start, 0, len)?;
        let stop = slice_bound(stop, len, len)?;
        Ok((start, stop.max(start)))
    };

    match collection {
        Value::List(l) => {
            let l = l.borrow();
            let (start, stop) = bounds(l.len())?;
            Ok(Value::list(l[start..stop].to_vec()))
        }
        Value::Tuple(t) => {
            let (start, stop) = bounds(t.len())?;
            Ok(Value::tuple(t[start..stop].to_vec()))
        }
        Value::String(s) => {
            let (start, stop) = bounds(s.chars().count())?;
            Ok(Value::String(s.chars().skip(start).take(stop - start).collect()))
        }
        _ => Ok(Value::Null),
    }
}

#[cfg(test)]
fn int(i: i64) -> Value {
    Value::Integer(i)
}

#[cfg(test)]
fn kind(res: Result<Value>) -> ErrorKind {
    res.unwrap_err().kind
}

#[test]
fn test_integer_arithmetic() {
    use BinaryOp::*;

    let data = vec![
        (Plus, 5, 5, int(10)),
        (Minus, 100, 3, int(97)),
        (Multiply, 100, 3, int(300)),
        (Divide, 7, 2, Value::Float(3.5)),
        (Divide, 6, 3, Value::Float(2.0)),
        (IntDivide, 7, 2, int(3)),
        (IntDivide, -7, 2, int(-4)),
        (IntDivide, 7, -2, int(-4)),
        (Modulo, 7, 3, int(1)),
        (Modulo, -7, 3, int(2)),
        (Modulo, 7, -3, int(-2)),
        (Modulo, i64::MIN, -1, int(0)),
        (Power, 2, 10, int(1024)),
        (Power, 2, -1, Value::Float(0.5)),
        (Power, -1, i64::MAX, int(-1)),
        (Power, 0, 0, int(1)),
    ];

    for (op, a, b, expected) in data {
        assert_eq!(binary(op, &int(a), &int(b)).unwrap(), expected, "{} {} {}", a, op.op_str(), b);
    }
}

#[test]
fn test_overflow() {
    use BinaryOp::*;

    let data = vec![
        (Plus, i64::MAX, 1),
        (Minus, i64::MIN, 1),
        (Multiply, i64::MAX, 2),
        (IntDivide, i64::MIN, -1),
        (Power, 2, 63),
        (LeftShift, 1, 63),
        (LeftShift, 1, 64),
    ];

    for (op, a, b) in data {
        assert!(
            matches!(kind(binary(op, &int(a), &int(b))), ErrorKind::Overflow(_)),
            "{} {} {}",
            a,
            op.op_str(),
            b
        );
    }

    assert_eq!(binary(Power, &int(2), &int(62)).unwrap(), int(1 << 62));
    assert_eq!(binary(LeftShift, &int(-1), &int(63)).unwrap(), int(i64::MIN));
    assert!(matches!(kind(unary(UnaryOp::Minus, &int(i64::MIN))), ErrorKind::Overflow(_)));
    assert!(matches!(kind(step(UnaryOp::Increment, &int(i64::MAX))), ErrorKind::Overflow(_)));
}

#[test]
fn test_zero_division() {
    use BinaryOp::*;

    for op in vec![Divide, IntDivide, Modulo] {
        assert!(matches!(kind(binary(op, &int(7), &int(0))), ErrorKind::ZeroDivision(_)));
        assert!(matches!(
            kind(binary(op, &Value::Float(7.0), &Value::Float(0.0))),
            ErrorKind::ZeroDivision(_)
        ));
    }
    assert!(matches!(kind(binary(Power, &int(0), &int(-1))), ErrorKind::ZeroDivision(_)));
}

#[test]
fn test_float_arithmetic() {
    use BinaryOp::*;

    let data = vec![
        (Plus, int(1), Value::Float(0.5), Value::Float(1.5)),
        (IntDivide, Value::Float(7.5), int(2), Value::Float(3.0)),
        (Modulo, Value::Float(-1.0), int(3), Value::Float(2.0)),
        (Power, Value::Float(2.0), int(3), Value::Float(8.0)),
    ];

    for (op, a, b, expected) in data {
        assert_eq!(binary(op, &a, &b).unwrap(), expected);
    }
}

#[test]
fn test_sequences() {
    use BinaryOp::*;

    let s = |s: &str| Value::String(s.to_string());

    assert_eq!(binary(Plus, &s("one"), &s("two")).unwrap(), s("onetwo"));
    assert_eq!(binary(Multiply, &s("ab"), &int(3)).unwrap(), s("ababab"));
    assert_eq!(binary(Multiply, &int(-1), &s("ab")).unwrap(), s(""));
    assert_eq!(
        binary(Plus, &Value::list(vec![int(1)]), &Value::list(vec![int(2)])).unwrap(),
        Value::list(vec![int(1), int(2)])
    );
    assert_eq!(
        binary(Multiply, &Value::tuple(vec![int(0)]), &int(2)).unwrap(),
        Value::tuple(vec![int(0), int(0)])
    );

    // No coercion between strings and numbers
    assert!(matches!(kind(binary(Plus, &s("1"), &int(1))), ErrorKind::Type(_)));
    assert!(matches!(kind(binary(Minus, &s("a"), &s("b"))), ErrorKind::Type(_)));
    assert!(matches!(
        kind(binary(Plus, &Value::list(vec![]), &Value::tuple(vec![]))),
        ErrorKind::Type(_)
    ));
}

#[test]
fn test_list_repetition() {
    use BinaryOp::*;

    let inner = Value::list(vec![int(1)]);
    let repeated = binary(Multiply, &Value::list(vec![inner.clone(), int(2)]), &int(2)).unwrap();
    assert_eq!(repeated.repr(), "[[1], 2, [1], 2]");

    // Elements are shared, not copied
    if let (Value::List(outer), Value::List(inner)) = (&repeated, &inner) {
        inner.borrow_mut().push(int(3));
        assert_eq!(outer.borrow()[2].repr(), "[1, 3]");
    }

    assert_eq!(binary(Multiply, &int(0), &Value::list(vec![int(1)])).unwrap(), Value::list(vec![]));
    assert!(matches!(
        kind(binary(Multiply, &Value::list(vec![int(1)]), &int(1 << 40))),
        ErrorKind::Overflow(_)
    ));
}

#[test]
fn test_compare_self_containing() {
    let a = Value::list(vec![]);
    let b = Value::list(vec![]);
    if let (Value::List(l), Value::List(m)) = (&a, &b) {
        l.borrow_mut().push(a.clone());
        l.borrow_mut().push(int(1));
        m.borrow_mut().push(b.clone());
        m.borrow_mut().push(int(2));
    }

    assert_eq!(compare(&a, &b).unwrap_err().kind, ErrorKind::Recursion(256));
}

#[test]
fn test_shifts_and_bits() {
    use BinaryOp::*;

    assert_eq!(binary(LeftShift, &int(1), &int(3)).unwrap(), int(8));
    assert_eq!(binary(RightShift, &int(-8), &int(1)).unwrap(), int(-4));
    assert_eq!(binary(RightShift, &int(-8), &int(100)).unwrap(), int(-1));
    assert_eq!(binary(BitXor, &int(1), &int(2)).unwrap(), int(3));
    assert!(matches!(kind(binary(LeftShift, &int(1), &int(-1))), ErrorKind::Value(_)));
    assert!(matches!(
        kind(binary(BitAnd, &int(1), &Value::Float(1.0))),
        ErrorKind::Type(_)
    ));
    assert_eq!(unary(UnaryOp::BitNot, &int(8)).unwrap(), int(-9));
}

#[test]
fn test_comparisons() {
    use BinaryOp::*;

    let data = vec![
        (LessThan, int(1), Value::Float(1.5), true),
        (GreaterThanEquals, Value::String("b".to_string()), Value::String("a".to_string()), true),
        (LessThan, Value::list(vec![int(1), int(2)]), Value::list(vec![int(1), int(3)]), true),
        (LessThan, Value::tuple(vec![int(1)]), Value::tuple(vec![int(1), int(0)]), true),
        (LessThan, Value::Float(f64::NAN), int(1), false),
        (GreaterThanEquals, Value::Float(f64::NAN), int(1), false),
        (Equals, Value::Null, Value::Null, true),
        (NotEquals, int(1), Value::String("1".to_string()), true),
    ];

    for (op, a, b, expected) in data {
        assert_eq!(binary(op, &a, &b).unwrap(), Value::from(expected), "{:?} {} {:?}", a, op.op_str(), b);
    }

    assert!(matches!(
        kind(binary(LessThan, &int(1), &Value::String("1".to_string()))),
        ErrorKind::Type(_)
    ));
}

#[test]
fn test_indexing() {
    let list = Value::list(vec![int(10), int(20), int(30)]);
    let word = Value::String("héllo".to_string());

    assert_eq!(index(&list, &int(1)).unwrap(), int(20));
    assert_eq!(index(&word, &int(1)).unwrap(), Value::String("é".to_string()));
    assert!(matches!(kind(index(&list, &int(3))), ErrorKind::Index(_)));
    assert!(matches!(kind(index(&list, &int(-1))), ErrorKind::Index(_)));
    assert!(matches!(kind(index(&list, &Value::Float(0.0))), ErrorKind::Type(_)));
    assert!(matches!(kind(index(&Value::set(Set::new()), &int(0))), ErrorKind::Type(_)));
    assert!(matches!(kind(index(&int(5), &int(0))), ErrorKind::Type(_)));
}

#[test]
fn test_slicing() {
    let list = Value::list(vec![int(10), int(20), int(30)]);
    let word = Value::String("héllo".to_string());

    assert_eq!(slice(&list, Some(&int(1)), None).unwrap(), Value::list(vec![int(20), int(30)]));
    assert_eq!(slice(&list, None, Some(&int(100))).unwrap(), list);
    assert_eq!(slice(&list, Some(&int(2)), Some(&int(1))).unwrap(), Value::list(vec![]));
    assert_eq!(slice(&word, Some(&int(1)), Some(&int(3))).unwrap(), Value::String("él".to_string()));
    assert!(matches!(kind(slice(&list, Some(&int(-1)), None)), ErrorKind::Index(_)));

    // Slices copy
    let copy = slice(&list, None, None).unwrap();
    if let Value::List(l) = &copy {
        l.borrow_mut().push(int(40));
    }
    assert_ne!(copy, list);
}
