use std::cell::RefCell;
use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::lang::ast::FunctionDef;
use crate::lang::error::{type_error, Result, RuntimeError};
use crate::lang::functions::Builtin;
use crate::lang::variables::WeakEnvironment;

#[derive(Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    /// Lists and sets are mutable in place; every copy of the value aliases the same storage
    List(Rc<RefCell<Vec<Value>>>),
    Set(Rc<RefCell<Set>>),
    Tuple(Rc<Vec<Value>>),
    Function(Function),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(items))
    }

    pub fn set(set: Set) -> Self {
        Value::Set(Rc::new(RefCell::new(set)))
    }

    /// Wrap a host function so scripts can call it
    ///
    /// `arity` of `None` accepts any number of arguments.
    pub fn native<S, F>(name: S, arity: Option<usize>, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Value::Function(Function::Native(Rc::new(Native {
            name: name.into(),
            arity,
            func: Box::new(func),
        })))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Tuple(_) => "tuple",
            Value::Function(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.borrow().is_empty(),
            Value::Set(s) => !s.borrow().is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Function(_) => true,
        }
    }

    pub fn as_integer(&self) -> Result<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            v => type_error(format!("expected integer, got '{}'", v.type_name())),
        }
    }

    /// Snapshot of the elements for iteration. Strings yield one string per character
    pub fn items(&self) -> Result<Vec<Value>> {
        match self {
            Value::List(l) => Ok(l.borrow().clone()),
            Value::Tuple(t) => Ok(t.to_vec()),
            Value::Set(s) => Ok(s.borrow().iter().cloned().collect()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            v => type_error(format!("'{}' object is not iterable", v.type_name())),
        }
    }

    /// Source-like representation: strings are quoted
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = write_value(&mut out, self, true, &mut Vec::new());

        out
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(if b { 1 } else { 0 })
    }
}

impl From<Builtin> for Value {
    fn from(b: Builtin) -> Self {
        Value::Function(Function::Builtin(b))
    }
}

/// `f` as an `i64`, if it has no fractional part and fits
pub fn float_to_int(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    if f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0 {
        Some(f as i64)
    } else {
        None
    }
}

type ListPtr = *const RefCell<Vec<Value>>;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_eq(self, other, &mut Vec::new())
    }
}

/// `active` holds the pairs of lists being compared further up. Meeting one of them again means
/// both sides loop back the same way, so that branch is taken as equal.
fn values_eq(lhs: &Value, rhs: &Value, active: &mut Vec<(ListPtr, ListPtr)>) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
            float_to_int(*f) == Some(*i)
        }
        (Value::String(a), Value::String(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
            if Rc::ptr_eq(a, b) || active.contains(&pair) {
                return true;
            }

            active.push(pair);
            let eq = slices_eq(&a.borrow(), &b.borrow(), active);
            active.pop();

            eq
        }
        (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b) || a.borrow().keys == b.borrow().keys,
        (Value::Tuple(a), Value::Tuple(b)) => slices_eq(a, b, active),
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

fn slices_eq(a: &[Value], b: &[Value], active: &mut Vec<(ListPtr, ListPtr)>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_eq(x, y, active))
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "INF".to_string()
    } else if f == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{:?}", f)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');

    out
}

/// Write `val`, quoting it when `quoted`. Elements are always quoted.
///
/// A list met again while it is still being written (it contains itself) prints as `[...]`.
fn write_value(
    out: &mut dyn fmt::Write,
    val: &Value,
    quoted: bool,
    open: &mut Vec<ListPtr>,
) -> fmt::Result {
    match val {
        Value::Null => out.write_str("null"),
        Value::Integer(i) => write!(out, "{}", i),
        Value::Float(x) => out.write_str(&format_float(*x)),
        Value::String(s) if quoted => out.write_str(&quote(s)),
        Value::String(s) => out.write_str(s),
        Value::List(l) => {
            let ptr = Rc::as_ptr(l);
            if open.contains(&ptr) {
                return out.write_str("[...]");
            }

            open.push(ptr);
            out.write_char('[')?;
            write_items(out, l.borrow().iter(), open)?;
            open.pop();

            out.write_char(']')
        }
        Value::Set(s) => {
            out.write_char('{')?;
            write_items(out, s.borrow().iter(), open)?;
            out.write_char('}')
        }
        Value::Tuple(t) => {
            out.write_char('(')?;
            write_items(out, t.iter(), open)?;
            if t.len() == 1 {
                out.write_char(',')?;
            }
            out.write_char(')')
        }
        Value::Function(func) => write!(out, "{}", func),
    }
}

fn write_items<'a, I: Iterator<Item = &'a Value>>(
    out: &mut dyn fmt::Write,
    items: I,
    open: &mut Vec<ListPtr>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_value(out, item, true, open)?;
    }

    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, false, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

/// A function defined in a script, along with the scope it was defined in
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: WeakEnvironment,
}

/// A function supplied by the host
pub struct Native {
    pub name: String,
    pub arity: Option<usize>,
    pub func: Box<dyn Fn(&[Value]) -> Result<Value>>,
}

#[derive(Clone)]
pub enum Function {
    Closure(Rc<Closure>),
    Builtin(Builtin),
    Native(Rc<Native>),
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            (Function::Builtin(a), Function::Builtin(b)) => a == b,
            (Function::Native(a), Function::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Closure(c) => write!(f, "<function/{}>", c.def.params.len()),
            Function::Builtin(b) => write!(f, "<builtin {}>", b),
            Function::Native(n) => write!(f, "<native {}>", n.name),
        }
    }
}

/// Hashable projection of a `Value`, used as set membership key
///
/// Integral floats map to the integer key so that `1` and `1.0` are the same member. NaNs all
/// share one key.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum SetKey {
    Null,
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Tuple(Vec<SetKey>),
}

impl TryFrom<&Value> for SetKey {
    type Error = RuntimeError;

    fn try_from(val: &Value) -> Result<Self> {
        Ok(match val {
            Value::Null => SetKey::Null,
            Value::Integer(i) => SetKey::Integer(*i),
            Value::Float(f) => match float_to_int(*f) {
                Some(i) => SetKey::Integer(i),
                None => SetKey::Float(OrderedFloat(*f)),
            },
            Value::String(s) => SetKey::String(s.clone()),
            Value::Tuple(items) => SetKey::Tuple(
                items
                    .iter()
                    .map(SetKey::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            v => return type_error(format!("unhashable type: '{}'", v.type_name())),
        })
    }
}

/// Insertion ordered set of hashable values
#[derive(Default, Clone)]
pub struct Set {
    keys: HashSet<SetKey>,
    items: Vec<Value>,
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<I: IntoIterator<Item = Value>>(values: I) -> Result<Self> {
        let mut set = Self::new();
        for val in values {
            set.insert(val)?;
        }

        Ok(set)
    }

    /// Returns whether `val` was newly added
    pub fn insert(&mut self, val: Value) -> Result<bool> {
        let key = SetKey::try_from(&val)?;
        if self.keys.insert(key) {
            self.items.push(val);
            return Ok(true);
        }

        Ok(false)
    }

    /// Returns whether `val` was present
    pub fn remove(&mut self, val: &Value) -> Result<bool> {
        let key = SetKey::try_from(val)?;
        if !self.keys.remove(&key) {
            return Ok(false);
        }

        self.items
            .retain(|v| SetKey::try_from(v).map_or(true, |k| k != key));

        Ok(true)
    }

    pub fn contains(&self, val: &Value) -> Result<bool> {
        Ok(self.keys.contains(&SetKey::try_from(val)?))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    fn filtered<F: Fn(&SetKey) -> bool>(&self, keep: F) -> Set {
        let mut out = Set::new();
        for val in &self.items {
            // Members were hashable going in
            if let Ok(key) = SetKey::try_from(val) {
                if keep(&key) {
                    out.keys.insert(key);
                    out.items.push(val.clone());
                }
            }
        }

        out
    }

    pub fn union(&self, other: &Set) -> Set {
        let mut out = self.clone();
        for val in &other.items {
            // Cannot fail, see `filtered`
            let _ = out.insert(val.clone());
        }

        out
    }

    pub fn intersection(&self, other: &Set) -> Set {
        self.filtered(|k| other.keys.contains(k))
    }

    pub fn difference(&self, other: &Set) -> Set {
        self.filtered(|k| !other.keys.contains(k))
    }

    pub fn symmetric_difference(&self, other: &Set) -> Set {
        let mut out = self.difference(other);
        for val in other.difference(self).items {
            let _ = out.insert(val);
        }

        out
    }
}

#[test]
fn test_display() {
    let data = vec![
        (Value::Null, "null", "null"),
        (Value::Integer(-3), "-3", "-3"),
        (Value::Float(3.5), "3.5", "3.5"),
        (Value::Float(2.0), "2.0", "2.0"),
        (Value::Float(f64::NAN), "NaN", "NaN"),
        (Value::Float(f64::NEG_INFINITY), "-INF", "-INF"),
        (Value::String("it's".to_string()), "it's", "'it\\'s'"),
        (
            Value::list(vec![Value::Integer(1), Value::String("a".to_string())]),
            "[1, 'a']",
            "[1, 'a']",
        ),
        (Value::tuple(vec![Value::Integer(1)]), "(1,)", "(1,)"),
        (Value::tuple(vec![]), "()", "()"),
        (Value::set(Set::new()), "{}", "{}"),
    ];

    for (val, display, repr) in data {
        assert_eq!(val.to_string(), display);
        assert_eq!(val.repr(), repr);
    }
}

#[test]
fn test_truthiness() {
    let data = vec![
        (Value::Null, false),
        (Value::Integer(0), false),
        (Value::Integer(-1), true),
        (Value::Float(0.0), false),
        (Value::Float(f64::NAN), true),
        (Value::String(String::new()), false),
        (Value::String("0".to_string()), true),
        (Value::list(vec![]), false),
        (Value::tuple(vec![Value::Null]), true),
        (Value::set(Set::new()), false),
        (Value::from(Builtin::Len), true),
    ];

    for (val, expected) in data {
        assert_eq!(val.is_truthy(), expected, "{:?}", val);
    }
}

#[test]
fn test_equality() {
    assert_eq!(Value::Integer(1), Value::Float(1.0));
    assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    assert_ne!(Value::Integer(1), Value::String("1".to_string()));
    assert_ne!(
        Value::list(vec![Value::Integer(1)]),
        Value::tuple(vec![Value::Integer(1)])
    );
    assert_eq!(
        Value::list(vec![Value::Integer(1)]),
        Value::list(vec![Value::Float(1.0)])
    );
}

#[test]
fn test_self_containing_lists() {
    let a = Value::list(vec![Value::Integer(1)]);
    let b = Value::list(vec![Value::Integer(1)]);
    if let (Value::List(l), Value::List(m)) = (&a, &b) {
        l.borrow_mut().push(a.clone());
        m.borrow_mut().push(b.clone());
    }

    assert_eq!(a.to_string(), "[1, [...]]");
    assert_eq!(Value::tuple(vec![a.clone()]).repr(), "([1, [...]],)");
    assert_eq!(a, b);
    assert_ne!(a, Value::list(vec![Value::Integer(1), Value::Integer(2)]));

    // Break the cycles so the test does not leak
    if let (Value::List(l), Value::List(m)) = (&a, &b) {
        l.borrow_mut().clear();
        m.borrow_mut().clear();
    }
}

#[test]
fn test_set_membership() {
    let mut set = Set::new();
    assert!(set.insert(Value::Integer(1)).unwrap());
    assert!(!set.insert(Value::Float(1.0)).unwrap());
    assert!(set.insert(Value::tuple(vec![Value::Integer(1), Value::Null])).unwrap());
    assert_eq!(set.len(), 2);

    let err = set.insert(Value::list(vec![])).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
    assert!(set.insert(Value::tuple(vec![Value::list(vec![])])).is_err());

    assert!(set.remove(&Value::Float(1.0)).unwrap());
    assert!(!set.contains(&Value::Integer(1)).unwrap());
    assert_eq!(set.len(), 1);
}

#[test]
fn test_set_algebra() {
    let ints = |v: &[i64]| Set::from_values(v.iter().map(|i| Value::Integer(*i))).unwrap();
    let a = ints(&[1, 2, 3]);
    let b = ints(&[3, 4]);

    assert_eq!(Value::set(a.union(&b)).to_string(), "{1, 2, 3, 4}");
    assert_eq!(Value::set(a.intersection(&b)).to_string(), "{3}");
    assert_eq!(Value::set(a.difference(&b)).to_string(), "{1, 2}");
    assert_eq!(Value::set(a.symmetric_difference(&b)).to_string(), "{1, 2, 4}");
}
