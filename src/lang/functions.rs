use std::convert::TryFrom;
use std::fmt;

use lazy_static::lazy_static;
use log::trace;

use crate::lang::error::{type_error, ErrorKind, Result, RuntimeError};
use crate::lang::eval::ops::compare;
use crate::lang::eval::value::{float_to_int, Set, Value};

/// Longest list `range()` may build
const MAX_RANGE_LEN: u64 = 1 << 28;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Builtin {
    Len,
    Type,
    Str,
    Repr,
    Int,
    Float,
    Abs,
    Min,
    Max,
    Range,
    List,
    Tuple,
    Set,
    Append,
    Pop,
    Add,
    Remove,
    Contains,
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Builtin::Len => "len",
            Builtin::Type => "type",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Range => "range",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Set => "set",
            Builtin::Append => "append",
            Builtin::Pop => "pop",
            Builtin::Add => "add",
            Builtin::Remove => "remove",
            Builtin::Contains => "contains",
        };

        write!(f, "{}", name)
    }
}

lazy_static! {
    pub static ref BUILTINS: Vec<Builtin> = vec![
        Builtin::Len,
        Builtin::Type,
        Builtin::Str,
        Builtin::Repr,
        Builtin::Int,
        Builtin::Float,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Range,
        Builtin::List,
        Builtin::Tuple,
        Builtin::Set,
        Builtin::Append,
        Builtin::Pop,
        Builtin::Add,
        Builtin::Remove,
        Builtin::Contains,
    ];
}

fn value_error<T, S: Into<String>>(message: S) -> Result<T> {
    Err(ErrorKind::Value(message.into()).into())
}

fn index_error<T, S: Into<String>>(message: S) -> Result<T> {
    Err(ErrorKind::Index(message.into()).into())
}

impl Builtin {
    /// Minimum and maximum number of arguments. `None` is unbounded
    fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Builtin::Len
            | Builtin::Type
            | Builtin::Str
            | Builtin::Repr
            | Builtin::Int
            | Builtin::Float
            | Builtin::Abs => (1, Some(1)),
            Builtin::Min | Builtin::Max => (1, None),
            Builtin::Range => (1, Some(3)),
            Builtin::List | Builtin::Tuple | Builtin::Set => (0, Some(1)),
            Builtin::Pop => (1, Some(2)),
            Builtin::Append | Builtin::Add | Builtin::Remove | Builtin::Contains => (2, Some(2)),
        }
    }

    fn check_arity(&self, given: usize) -> Result<()> {
        let (min, max) = self.arity();
        let ok = given >= min && max.map_or(true, |max| given <= max);
        if ok {
            return Ok(());
        }

        let expected = match max {
            Some(max) if max == min => format!("{}", min),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        type_error(format!(
            "{}() takes {} argument(s) ({} given)",
            self, expected, given
        ))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.check_arity(args.len())?;
        trace!("calling builtin {}() with {} args", self, args.len());

        match self {
            Builtin::Len => len(&args[0]),
            Builtin::Type => Ok(Value::String(args[0].type_name().to_string())),
            Builtin::Str => Ok(Value::String(args[0].to_string())),
            Builtin::Repr => Ok(Value::String(args[0].repr())),
            Builtin::Int => int(&args[0]),
            Builtin::Float => float(&args[0]),
            Builtin::Abs => match &args[0] {
                Value::Integer(i) => i.checked_abs().map(Value::Integer).ok_or_else(|| {
                    RuntimeError::from(ErrorKind::Overflow(format!("abs({}) overflows", i)))
                }),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                v => type_error(format!("bad operand type for abs(): '{}'", v.type_name())),
            },
            Builtin::Min => extremum(self, args, std::cmp::Ordering::Less),
            Builtin::Max => extremum(self, args, std::cmp::Ordering::Greater),
            Builtin::Range => range(args),
            Builtin::List => Ok(Value::list(items(args)?)),
            Builtin::Tuple => Ok(Value::tuple(items(args)?)),
            Builtin::Set => Ok(Value::set(Set::from_values(items(args)?)?)),
            Builtin::Append => match &args[0] {
                Value::List(l) => {
                    l.borrow_mut().push(args[1].clone());
                    Ok(Value::Null)
                }
                v => type_error(format!("append() needs a list, not '{}'", v.type_name())),
            },
            Builtin::Pop => pop(args),
            Builtin::Add => match &args[0] {
                Value::Set(s) => {
                    s.borrow_mut().insert(args[1].clone())?;
                    Ok(Value::Null)
                }
                v => type_error(format!("add() needs a set, not '{}'", v.type_name())),
            },
            Builtin::Remove => remove(&args[0], &args[1]),
            Builtin::Contains => contains(&args[0], &args[1]),
        }
    }
}

fn len(val: &Value) -> Result<Value> {
    let len = match val {
        Value::String(s) => s.chars().count(),
        Value::List(l) => l.borrow().len(),
        Value::Tuple(t) => t.len(),
        Value::Set(s) => s.borrow().len(),
        v => return type_error(format!("object of type '{}' has no len()", v.type_name())),
    };

    i64::try_from(len)
        .map(Value::Integer)
        .map_err(|_| ErrorKind::Overflow("length does not fit in an integer".to_string()).into())
}

fn int(val: &Value) -> Result<Value> {
    match val {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Float(f) => {
            if !f.is_finite() {
                return value_error(format!("cannot convert {} to integer", val));
            }

            float_to_int(f.trunc()).map(Value::Integer).ok_or_else(|| {
                ErrorKind::Overflow(format!("{} does not fit in an integer", val)).into()
            })
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(Value::Integer(i)),
            Err(_) => value_error(format!("invalid literal for int(): {}", val.repr())),
        },
        v => type_error(format!("int() argument must be a string or a number, not '{}'", v.type_name())),
    }
}

fn float(val: &Value) -> Result<Value> {
    match val {
        Value::Integer(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::String(s) => match s.trim() {
            "NaN" => Ok(Value::Float(f64::NAN)),
            "INF" => Ok(Value::Float(f64::INFINITY)),
            "-INF" => Ok(Value::Float(f64::NEG_INFINITY)),
            t => match t.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => value_error(format!("could not convert string to float: {}", val.repr())),
            },
        },
        v => type_error(format!("float() argument must be a string or a number, not '{}'", v.type_name())),
    }
}

/// Elements of the optional single argument of `list()`, `tuple()` and `set()`
fn items(args: &[Value]) -> Result<Vec<Value>> {
    match args.first() {
        Some(v) => v.items(),
        None => Ok(Vec::new()),
    }
}

/// `min()`/`max()` over either the arguments, or the elements of a single argument
fn extremum(func: &Builtin, args: &[Value], wanted: std::cmp::Ordering) -> Result<Value> {
    let candidates = if args.len() == 1 {
        args[0].items()?
    } else {
        args.to_vec()
    };

    let mut best: Option<Value> = None;
    for val in candidates {
        best = match best {
            None => Some(val),
            Some(b) => {
                if compare(&val, &b)? == Some(wanted) {
                    Some(val)
                } else {
                    Some(b)
                }
            }
        };
    }

    match best {
        Some(v) => Ok(v),
        None => value_error(format!("{}() arg is an empty sequence", func)),
    }
}

fn range(args: &[Value]) -> Result<Value> {
    let ints = args
        .iter()
        .map(Value::as_integer)
        .collect::<Result<Vec<i64>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return type_error("range() takes 1 to 3 arguments"),
    };
    if step == 0 {
        return value_error("range() step must not be zero");
    }

    // Number of elements, computed wide so it cannot overflow
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let count = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    if count > i128::from(MAX_RANGE_LEN) {
        return value_error(format!("range() of {} elements is too large", count));
    }

    let items = (0..count)
        .map(|i| Value::Integer((start + i * step) as i64))
        .collect();

    Ok(Value::list(items))
}

fn pop(args: &[Value]) -> Result<Value> {
    let list = match &args[0] {
        Value::List(l) => l,
        v => return type_error(format!("pop() needs a list, not '{}'", v.type_name())),
    };
    let mut list = list.borrow_mut();
    if list.is_empty() {
        return index_error("pop from empty list");
    }

    match args.get(1) {
        None => Ok(list.pop().unwrap_or(Value::Null)),
        Some(index) => {
            let i = index.as_integer()?;
            match usize::try_from(i) {
                Ok(pos) if pos < list.len() => Ok(list.remove(pos)),
                _ => index_error(format!("pop index {} out of range", i)),
            }
        }
    }
}

fn remove(collection: &Value, val: &Value) -> Result<Value> {
    match collection {
        Value::Set(s) => {
            if !s.borrow_mut().remove(val)? {
                return Err(ErrorKind::Key(val.repr()).into());
            }
            Ok(Value::Null)
        }
        Value::List(l) => {
            // `val` may be the list itself, so the search borrow ends before the mutable one
            let found = l.borrow().iter().position(|v| v == val);
            match found {
                Some(pos) => {
                    l.borrow_mut().remove(pos);
                    Ok(Value::Null)
                }
                None => value_error(format!("{} is not in list", val.repr())),
            }
        }
        v => type_error(format!("remove() needs a set or list, not '{}'", v.type_name())),
    }
}

fn contains(collection: &Value, val: &Value) -> Result<Value> {
    let found = match (collection, val) {
        (Value::Set(s), v) => s.borrow().contains(v)?,
        (Value::List(l), v) => l.borrow().iter().any(|x| x == v),
        (Value::Tuple(t), v) => t.iter().any(|x| x == v),
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        (Value::String(_), v) => {
            return type_error(format!(
                "'in <string>' requires string as left operand, not '{}'",
                v.type_name()
            ))
        }
        (c, _) => return type_error(format!("'{}' object is not a container", c.type_name())),
    };

    Ok(Value::from(found))
}

#[cfg(test)]
fn call(func: Builtin, args: Vec<Value>) -> Result<Value> {
    func.call(&args)
}

#[cfg(test)]
fn ints(v: &[i64]) -> Value {
    Value::list(v.iter().map(|i| Value::Integer(*i)).collect())
}

#[test]
fn test_conversions() {
    let s = |s: &str| Value::String(s.to_string());

    let data = vec![
        (Builtin::Type, s("x"), s("string")),
        (Builtin::Type, Value::Null, s("null")),
        (Builtin::Str, Value::Float(1.0), s("1.0")),
        (Builtin::Str, s("a"), s("a")),
        (Builtin::Repr, s("a"), s("'a'")),
        (Builtin::Int, Value::Float(-2.7), Value::Integer(-2)),
        (Builtin::Int, s(" 42 "), Value::Integer(42)),
        (Builtin::Float, Value::Integer(3), Value::Float(3.0)),
        (Builtin::Float, s("2.5"), Value::Float(2.5)),
        (Builtin::Abs, Value::Integer(-3), Value::Integer(3)),
        (Builtin::Len, s("héllo"), Value::Integer(5)),
        (Builtin::Len, ints(&[1, 2]), Value::Integer(2)),
    ];

    for (func, arg, expected) in data {
        assert_eq!(call(func, vec![arg]).unwrap(), expected, "{}", func);
    }

    assert!(matches!(call(Builtin::Int, vec![s("abc")]).unwrap_err().kind, ErrorKind::Value(_)));
    assert!(matches!(
        call(Builtin::Int, vec![Value::Float(f64::NAN)]).unwrap_err().kind,
        ErrorKind::Value(_)
    ));
    assert!(matches!(call(Builtin::Len, vec![Value::Integer(1)]).unwrap_err().kind, ErrorKind::Type(_)));
    assert!(matches!(
        call(Builtin::Abs, vec![Value::Integer(i64::MIN)]).unwrap_err().kind,
        ErrorKind::Overflow(_)
    ));
}

#[test]
fn test_arity() {
    let err = call(Builtin::Len, vec![]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: len() takes 1 argument(s) (0 given)");

    let err = call(Builtin::Range, vec![Value::Integer(1); 4]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: range() takes 1 to 3 argument(s) (4 given)");
}

#[test]
fn test_range() {
    let data = vec![
        (vec![3], ints(&[0, 1, 2])),
        (vec![2, 5], ints(&[2, 3, 4])),
        (vec![0, 10, 3], ints(&[0, 3, 6, 9])),
        (vec![5, 0, -2], ints(&[5, 3, 1])),
        (vec![5, 2], ints(&[])),
    ];

    for (args, expected) in data {
        let args = args.into_iter().map(Value::Integer).collect();
        assert_eq!(call(Builtin::Range, args).unwrap(), expected);
    }

    let err = call(Builtin::Range, vec![Value::Integer(0), Value::Integer(1), Value::Integer(0)]);
    assert!(matches!(err.unwrap_err().kind, ErrorKind::Value(_)));
    let err = call(Builtin::Range, vec![Value::Integer(i64::MAX)]);
    assert!(matches!(err.unwrap_err().kind, ErrorKind::Value(_)));
}

#[test]
fn test_min_max() {
    assert_eq!(call(Builtin::Min, vec![ints(&[3, 1, 2])]).unwrap(), Value::Integer(1));
    assert_eq!(
        call(Builtin::Max, vec![Value::Integer(3), Value::Float(4.5)]).unwrap(),
        Value::Float(4.5)
    );
    assert!(matches!(call(Builtin::Max, vec![ints(&[])]).unwrap_err().kind, ErrorKind::Value(_)));
    assert!(matches!(
        call(Builtin::Min, vec![Value::Integer(1), Value::String("a".to_string())]).unwrap_err().kind,
        ErrorKind::Type(_)
    ));
}

#[test]
fn test_mutation() {
    let list = ints(&[1]);
    call(Builtin::Append, vec![list.clone(), Value::Integer(2)]).unwrap();
    assert_eq!(list, ints(&[1, 2]));
    assert_eq!(call(Builtin::Pop, vec![list.clone()]).unwrap(), Value::Integer(2));
    assert_eq!(call(Builtin::Pop, vec![list.clone(), Value::Integer(0)]).unwrap(), Value::Integer(1));
    assert!(matches!(call(Builtin::Pop, vec![list]).unwrap_err().kind, ErrorKind::Index(_)));

    let set = call(Builtin::Set, vec![ints(&[1, 1, 2])]).unwrap();
    assert_eq!(call(Builtin::Len, vec![set.clone()]).unwrap(), Value::Integer(2));
    call(Builtin::Add, vec![set.clone(), Value::Integer(3)]).unwrap();
    call(Builtin::Remove, vec![set.clone(), Value::Integer(1)]).unwrap();
    assert_eq!(set.to_string(), "{2, 3}");
    assert!(matches!(
        call(Builtin::Remove, vec![set.clone(), Value::Integer(1)]).unwrap_err().kind,
        ErrorKind::Key(_)
    ));
    assert!(matches!(
        call(Builtin::Add, vec![set, ints(&[])]).unwrap_err().kind,
        ErrorKind::Type(_)
    ));
}

#[test]
fn test_remove_from_list() {
    let inner = ints(&[1]);
    let list = Value::list(vec![inner.clone(), Value::Integer(2)]);
    assert!(matches!(
        call(Builtin::Remove, vec![list.clone(), list.clone()]).unwrap_err().kind,
        ErrorKind::Value(_)
    ));

    call(Builtin::Remove, vec![list.clone(), ints(&[1])]).unwrap();
    assert_eq!(list, ints(&[2]));
    assert_eq!(inner, ints(&[1]));
}

#[test]
fn test_contains() {
    let s = |s: &str| Value::String(s.to_string());

    assert_eq!(call(Builtin::Contains, vec![ints(&[1, 2]), Value::Float(2.0)]).unwrap(), Value::Integer(1));
    assert_eq!(call(Builtin::Contains, vec![s("hello"), s("ell")]).unwrap(), Value::Integer(1));
    assert_eq!(
        call(Builtin::Contains, vec![Value::tuple(vec![]), Value::Null]).unwrap(),
        Value::Integer(0)
    );
    assert!(call(Builtin::Contains, vec![Value::Integer(1), Value::Integer(1)]).is_err());
}
