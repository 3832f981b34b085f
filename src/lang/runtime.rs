use log::debug;

use crate::lang::error::Error;
use crate::lang::eval::{Eval, Value};
use crate::lang::lex::DEFAULT_MAX_NESTING;
use crate::lang::parse::parse_with;
use crate::lang::variables::Environment;

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Knobs for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Nesting of function calls and blocks allowed before a `RecursionError` is raised
    pub max_depth: usize,
    /// Deepest bracket nesting accepted in source text
    pub max_nesting: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// Evaluates source text against a persistent global environment
///
/// Bindings made by one call to `eval` are visible to the next, even if that call failed part way
/// through.
pub struct Runtime {
    config: Config,
    env: Environment,
}

impl Runtime {
    /// Create a new `Runtime` instance with only the builtins in scope
    pub fn new(config: Config) -> Self {
        Self::with_bindings(config, Vec::new())
    }

    /// Create a new `Runtime` instance with host provided `bindings` in the global frame
    ///
    /// eg. a `print` function built with `Value::native`
    pub fn with_bindings<I>(config: Config, bindings: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            config,
            env: Environment::global(bindings),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn eval(&mut self, src: &str) -> Result<Value, Error> {
        let program = parse_with(src, self.config.max_nesting)?;
        debug!("parsed {} statements", program.statements.len());

        let val = Eval::new(&self.config).eval(&program, &self.env)?;

        Ok(val)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[test]
fn test_bindings_persist() {
    let mut rt = Runtime::default();

    assert_eq!(rt.eval("x = 2").unwrap(), Value::Integer(2));
    assert_eq!(rt.eval("double = (n) { n * 2 }").unwrap().type_name(), "function");
    assert_eq!(rt.eval("double(x)").unwrap(), Value::Integer(4));
    assert_eq!(rt.env().get("x"), Some(Value::Integer(2)));
}

#[test]
fn test_errors() {
    use crate::lang::error::ErrorKind;

    let mut rt = Runtime::default();

    // Nothing runs when the input does not parse
    match rt.eval("a = 1\nb = (") {
        Err(Error::Syntax(e)) => assert_eq!(e.pos.line, 2),
        r => panic!("expected a syntax error, got {:?}", r),
    }
    assert_eq!(rt.env().get("a"), None);

    // Effects before a runtime error stick
    match rt.eval("a = 1\nb = c") {
        Err(Error::Runtime(e)) => assert_eq!(e.kind, ErrorKind::Name("c".to_string())),
        r => panic!("expected a runtime error, got {:?}", r),
    }
    assert_eq!(rt.env().get("a"), Some(Value::Integer(1)));
    assert_eq!(rt.env().get("b"), None);
}

#[test]
fn test_config() {
    use crate::lang::error::ErrorKind;

    let mut rt = Runtime::new(Config {
        max_depth: 3,
        max_nesting: 2,
    });
    rt.eval("f = (n) { n == 0 ? 0 : f(n - 1) }").unwrap();

    assert_eq!(rt.eval("f(2)").unwrap(), Value::Integer(0));
    match rt.eval("f(3)") {
        Err(Error::Runtime(e)) => assert_eq!(e.kind, ErrorKind::Recursion(3)),
        r => panic!("expected a recursion error, got {:?}", r),
    }

    assert_eq!(rt.eval("[[1]]").unwrap().to_string(), "[[1]]");
    match rt.eval("[[[1]]]") {
        Err(Error::Syntax(e)) => assert_eq!(e.message, "too many nested brackets (limit 2)"),
        r => panic!("expected a syntax error, got {:?}", r),
    }
}

#[test]
fn test_native_bindings() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let out = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&out);
    let print = Value::native("print", None, move |args| {
        let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
        sink.borrow_mut().push(line.join(" "));
        Ok(Value::Null)
    });

    let mut rt = Runtime::with_bindings(Config::default(), vec![("print".to_string(), print)]);
    let val = rt
        .eval("for (i in range(3)) print('line', i)\nprint()")
        .unwrap();

    assert_eq!(val, Value::Null);
    assert_eq!(*out.borrow(), vec!["line 0", "line 1", "line 2", ""]);
}

#[test]
fn test_captured_scopes_are_released() {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    // `marker()` returns a fresh list and remembers a weak handle to it
    let last = Rc::new(RefCell::new(Weak::new()));
    let slot = Rc::clone(&last);
    let marker = Value::native("marker", Some(0), move |_| {
        let list = Value::list(Vec::new());
        if let Value::List(l) = &list {
            *slot.borrow_mut() = Rc::downgrade(l);
        }
        Ok(list)
    });
    let alive = || last.borrow().upgrade().is_some();

    let mut rt = Runtime::with_bindings(Config::default(), vec![("marker".to_string(), marker)]);

    // The call frame holds `helper`, which captured that same frame
    rt.eval("f = (m) { keep = m; helper = () { 1 }; 0 }\nf(marker())").unwrap();
    assert!(!alive());

    // The result keeps its scope until the next evaluation
    rt.eval("g = () { m = marker(); () { m } }\ng()").unwrap();
    assert!(alive());
    rt.eval("0").unwrap();
    assert!(!alive());

    // Bound closures keep their scope across evaluations
    rt.eval("make = () { x = 41; () { x + 1 } }\nh = make()").unwrap();
    assert_eq!(rt.eval("h()").unwrap(), Value::Integer(42));
    assert_eq!(rt.eval("make()()").unwrap(), Value::Integer(42));

    // Everything goes with the runtime
    rt.eval("kept = [marker()]\nkeep = () { kept }").unwrap();
    assert!(alive());
    drop(rt);
    assert!(!alive());
}
