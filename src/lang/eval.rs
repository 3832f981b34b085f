//! Tree-walking evaluation of a parsed `Program`.
//!
//! Statements produce values: an expression statement its value, a block the value of its last
//! statement, an `if` the value of the branch taken (or null) and loops null. Control flow
//! (`break`, `continue`, `return`) travels back up the walk alongside the value and never leaves
//! this module.

pub mod ops;
pub mod value;

use std::rc::Rc;

use log::{debug, trace};

pub use value::{Closure, Function, Native, Set, SetKey, Value};

use crate::lang::ast::*;
use crate::lang::error::{type_error, ErrorKind, Result, RuntimeError};
use crate::lang::runtime::Config;
use crate::lang::variables::Environment;

/// Internal result of executing a statement
///
/// We don't want to expose internal details (like control flow) to anyone outside this module
enum InternalEvalResult {
    Ok(Value),
    Break,
    Continue,
    Return(Value),
}

fn name_error(ident: &Identifier) -> RuntimeError {
    ErrorKind::Name(ident.0.clone()).into()
}

pub struct Eval {
    max_depth: usize,
    /// Function calls and blocks currently executing
    depth: usize,
}

impl Eval {
    pub fn new(config: &Config) -> Self {
        Self {
            max_depth: config.max_depth,
            depth: 0,
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(ErrorKind::Recursion(self.max_depth).into());
        }
        self.depth += 1;

        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn eval_constant(c: &Constant) -> Value {
        match c {
            Constant::Null => Value::Null,
            Constant::Integer(i) => Value::Integer(*i),
            Constant::Float(f) => Value::Float(*f),
            Constant::Str(s) => Value::String(s.clone()),
        }
    }

    /// `++x`, `--x`, `x++`, `x--`
    fn eval_update(
        &mut self,
        op: UnaryOp,
        ident: &Identifier,
        prefix: bool,
        env: &Environment,
    ) -> Result<Value> {
        let old = env.get(&ident.0).ok_or_else(|| name_error(ident))?;
        let new = ops::step(op, &old)?;
        env.assign(&ident.0, new.clone());

        Ok(if prefix { new } else { old })
    }

    fn eval_assignment(
        &mut self,
        ident: &Identifier,
        op: AssignOp,
        rhs: &Expression,
        env: &Environment,
    ) -> Result<Value> {
        let val = match op {
            AssignOp::Assign => self.eval_expr(rhs, env)?,
            AssignOp::Compound(op) => {
                // Target is read exactly once, before the right hand side
                let current = env.get(&ident.0).ok_or_else(|| name_error(ident))?;
                let rhs = self.eval_expr(rhs, env)?;
                ops::binary(op, &current, &rhs)?
            }
        };

        env.assign(&ident.0, val.clone());

        Ok(val)
    }

    fn eval_binop(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        env: &Environment,
    ) -> Result<Value> {
        let lhs_val = self.eval_expr(lhs, env)?;

        // Short-circuit, yielding whichever operand decided the result
        match op {
            BinaryOp::LogicalAnd if !lhs_val.is_truthy() => return Ok(lhs_val),
            BinaryOp::LogicalOr if lhs_val.is_truthy() => return Ok(lhs_val),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => return self.eval_expr(rhs, env),
            _ => (),
        }

        let rhs_val = self.eval_expr(rhs, env)?;
        ops::binary(op, &lhs_val, &rhs_val)
    }

    fn eval_collection(
        &mut self,
        kind: CollectionKind,
        items: &[Expression],
        env: &Environment,
    ) -> Result<Value> {
        let mut vals = Vec::with_capacity(items.len());
        for item in items {
            vals.push(self.eval_expr(item, env)?);
        }

        Ok(match kind {
            CollectionKind::List => Value::list(vals),
            CollectionKind::Tuple => Value::tuple(vals),
            CollectionKind::Set => Value::set(Set::from_values(vals)?),
        })
    }

    fn eval_expr(&mut self, expr: &Expression, env: &Environment) -> Result<Value> {
        match expr {
            Expression::Literal(c) => Ok(Self::eval_constant(c)),
            Expression::Identifier(ident) => env.get(&ident.0).ok_or_else(|| name_error(ident)),
            Expression::Unary(op @ (UnaryOp::Increment | UnaryOp::Decrement), operand) => {
                match &**operand {
                    Expression::Identifier(ident) => self.eval_update(*op, ident, true, env),
                    _ => type_error(format!("'{}' needs a variable", op.op_str())),
                }
            }
            Expression::Unary(op, operand) => {
                let val = self.eval_expr(operand, env)?;
                ops::unary(*op, &val)
            }
            Expression::Postfix(op, ident) => self.eval_update(*op, ident, false, env),
            Expression::Binary(op, lhs, rhs) => self.eval_binop(*op, lhs, rhs, env),
            Expression::Assignment(ident, op, rhs) => self.eval_assignment(ident, *op, rhs, env),
            Expression::Ternary(cond, true_val, false_val) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_expr(true_val, env)
                } else {
                    self.eval_expr(false_val, env)
                }
            }
            Expression::Call(func, args) => {
                let func = self.eval_expr(func, env)?;
                let mut arg_vals = Vec::with_capacity(args.len());
                for arg in args {
                    arg_vals.push(self.eval_expr(arg, env)?);
                }

                self.call(&func, arg_vals)
            }
            Expression::Index(collection, index) => {
                let collection = self.eval_expr(collection, env)?;
                let index = self.eval_expr(index, env)?;
                ops::index(&collection, &index)
            }
            Expression::Slice(collection, start, stop) => {
                let collection = self.eval_expr(collection, env)?;
                let start = match start {
                    Some(e) => Some(self.eval_expr(e, env)?),
                    None => None,
                };
                let stop = match stop {
                    Some(e) => Some(self.eval_expr(e, env)?),
                    None => None,
                };

                ops::slice(&collection, start.as_ref(), stop.as_ref())
            }
            Expression::Collection(kind, items) => self.eval_collection(*kind, items, env),
            Expression::Function(def) => Ok(Value::Function(Function::Closure(Rc::new(Closure {
                def: Rc::clone(def),
                env: env.capture(),
            })))),
        }
    }

    /// Call `func` with already evaluated arguments
    pub fn call(&mut self, func: &Value, args: Vec<Value>) -> Result<Value> {
        let func = match func {
            Value::Function(f) => f,
            v => return type_error(format!("'{}' object is not callable", v.type_name())),
        };

        match func {
            Function::Builtin(builtin) => builtin.call(&args),
            Function::Native(native) => {
                if let Some(arity) = native.arity {
                    if arity != args.len() {
                        return type_error(format!(
                            "{}() takes {} argument(s) ({} given)",
                            native.name,
                            arity,
                            args.len()
                        ));
                    }
                }
                trace!("calling native {}() with {} args", native.name, args.len());

                (native.func)(args.as_slice())
            }
            Function::Closure(closure) => {
                let params = &closure.def.params;
                if params.len() != args.len() {
                    return type_error(format!(
                        "function takes {} argument(s) ({} given)",
                        params.len(),
                        args.len()
                    ));
                }

                // Only a host holding on to a function past the environment it came from gets here
                let scope = match closure.env.upgrade() {
                    Some(scope) => scope,
                    None => {
                        return Err(ErrorKind::Value(
                            "function outlived the scope it was defined in".to_string(),
                        )
                        .into())
                    }
                };

                self.enter()?;
                trace!("calling function at depth {}", self.depth);

                // Lexical scoping: the new frame hangs off the defining scope, not the caller's
                let frame = scope.child();
                for (param, arg) in params.iter().zip(args) {
                    frame.insert(param.0.clone(), arg);
                }
                let ret = self.eval_block_in(&closure.def.body, &frame);

                self.leave();

                match ret? {
                    InternalEvalResult::Ok(v) | InternalEvalResult::Return(v) => Ok(v),
                    InternalEvalResult::Break | InternalEvalResult::Continue => Ok(Value::Null),
                }
            }
        }
    }

    /// Run the statements of `block` directly in `env`
    fn eval_block_in(&mut self, block: &Block, env: &Environment) -> Result<InternalEvalResult> {
        let mut last = Value::Null;
        for stmt in &block.statements {
            match self.eval_statement(stmt, env)? {
                InternalEvalResult::Ok(v) => last = v,
                r => return Ok(r),
            }
        }

        Ok(InternalEvalResult::Ok(last))
    }

    /// Run the body of an `if` or a loop in its own frame
    fn eval_body(&mut self, body: &Statement, env: &Environment) -> Result<InternalEvalResult> {
        self.eval_statement(body, &env.child())
    }

    fn eval_if(
        &mut self,
        cond: &Expression,
        true_body: &Statement,
        false_body: Option<&Statement>,
        env: &Environment,
    ) -> Result<InternalEvalResult> {
        let body = if self.eval_expr(cond, env)?.is_truthy() {
            Some(true_body)
        } else {
            false_body
        };

        match body {
            Some(body) => self.eval_body(body, env),
            None => Ok(InternalEvalResult::Ok(Value::Null)),
        }
    }

    fn eval_while(
        &mut self,
        cond: &Expression,
        body: &Statement,
        env: &Environment,
    ) -> Result<InternalEvalResult> {
        while self.eval_expr(cond, env)?.is_truthy() {
            match self.eval_body(body, env)? {
                InternalEvalResult::Ok(_) | InternalEvalResult::Continue => (),
                InternalEvalResult::Break => break,
                r @ InternalEvalResult::Return(_) => return Ok(r),
            }
        }

        Ok(InternalEvalResult::Ok(Value::Null))
    }

    /// Iterates over a snapshot of the iterable, so mutating it in the body is safe
    fn eval_for(
        &mut self,
        ident: &Identifier,
        iterable: &Expression,
        body: &Statement,
        env: &Environment,
    ) -> Result<InternalEvalResult> {
        let items = self.eval_expr(iterable, env)?.items()?;

        for item in items {
            let frame = env.child();
            frame.insert(ident.0.clone(), item);

            match self.eval_statement(body, &frame)? {
                InternalEvalResult::Ok(_) | InternalEvalResult::Continue => (),
                InternalEvalResult::Break => break,
                r @ InternalEvalResult::Return(_) => return Ok(r),
            }
        }

        Ok(InternalEvalResult::Ok(Value::Null))
    }

    fn eval_statement(&mut self, stmt: &Statement, env: &Environment) -> Result<InternalEvalResult> {
        let ret = match &stmt.kind {
            StatementKind::Expression(expr) => self.eval_expr(expr, env).map(InternalEvalResult::Ok),
            StatementKind::Block(block) => match self.enter() {
                Ok(()) => {
                    let ret = self.eval_block_in(block, &env.child());
                    self.leave();

                    ret
                }
                Err(e) => Err(e),
            },
            StatementKind::If(cond, true_body, false_body) => {
                self.eval_if(cond, true_body, false_body.as_deref(), env)
            }
            StatementKind::While(cond, body) => self.eval_while(cond, body, env),
            StatementKind::For(ident, iterable, body) => self.eval_for(ident, iterable, body, env),
            StatementKind::Break => Ok(InternalEvalResult::Break),
            StatementKind::Continue => Ok(InternalEvalResult::Continue),
            StatementKind::Return(value) => match value {
                Some(expr) => self.eval_expr(expr, env).map(InternalEvalResult::Return),
                None => Ok(InternalEvalResult::Return(Value::Null)),
            },
        };

        // Innermost statement wins: positions already set deeper down are kept
        ret.map_err(|e| e.at(stmt.pos))
    }

    /// Evaluate `program` against `env`, returning the value of the last top level statement
    ///
    /// Afterwards, scopes captured by closures that are neither reachable from `env` nor from the
    /// result are released.
    pub fn eval(&mut self, program: &Program, env: &Environment) -> Result<Value> {
        let ret = self.eval_program(program, env);
        env.sweep(ret.as_ref().ok());

        ret
    }

    fn eval_program(&mut self, program: &Program, env: &Environment) -> Result<Value> {
        debug!("evaluating {} statements", program.statements.len());

        let mut last = Value::Null;
        for stmt in &program.statements {
            match self.eval_statement(stmt, env)? {
                InternalEvalResult::Ok(v) => last = v,
                // Parsed programs cannot get here; hand-built ones stop at the stray jump
                InternalEvalResult::Return(v) => return Ok(v),
                InternalEvalResult::Break | InternalEvalResult::Continue => break,
            }
        }

        debug!("evaluation finished with a {}", last.type_name());

        Ok(last)
    }
}

#[cfg(test)]
fn run_with(input: &str, bindings: Vec<(String, Value)>, max_depth: usize) -> Result<Value> {
    use crate::lang::parse::parse;

    let program = parse(input).expect("Failed to parse");
    let env = Environment::global(bindings);
    let config = Config {
        max_depth,
        ..Config::default()
    };
    Eval::new(&config).eval(&program, &env)
}

#[cfg(test)]
fn run(input: &str) -> Result<Value> {
    run_with(input, vec![], 64)
}

#[cfg(test)]
fn run_ok(input: &str) -> String {
    match run(input) {
        Ok(v) => v.repr(),
        Err(e) => panic!("{}: {}", input, e),
    }
}

#[cfg(test)]
fn run_err(input: &str) -> ErrorKind {
    match run(input) {
        Ok(v) => panic!("{}: expected an error, got {}", input, v.repr()),
        Err(e) => e.kind,
    }
}

#[test]
fn test_expression() {
    let tests = vec![
        ("~8", "-9"),
        ("-8", "-8"),
        ("!8", "0"),
        ("!0", "1"),
        ("!!8", "1"),
        ("5 + 5", "10"),
        ("100 -3", "97"),
        ("100* 3", "300"),
        ("1 + 2 * 3", "7"),
        ("(1 + 2) * 3", "9"),
        ("2 ** 3 ** 2", "512"),
        ("-2 ** 2", "-4"),
        ("2 ** -1", "0.5"),
        ("1 == 1", "1"),
        ("true == false", "0"),
        ("true != false && 2 == 2", "1"),
        ("7 & 1", "1"),
        ("0 | 1 | 2", "3"),
        ("1 ^ 2", "3"),
        ("1 << 3", "8"),
        ("3 <= 3", "1"),
        ("3 > 3", "0"),
        ("0x10 + 0b11 + 0o7", "26"),
        ("1 ? 'a' : 'b'", "'a'"),
        ("0 ? 'a' : null ? 'b' : 'c'", "'c'"),
        ("'one' + 'two'", "'onetwo'"),
        ("[1, 2] + [3]", "[1, 2, 3]"),
        ("{1, 2, 2, 1.0}", "{1, 2}"),
        ("{1, 2} - {2}", "{1}"),
        ("{1, 2} & {2, 3}", "{2}"),
        ("({1} | {2})", "{1, 2}"),
        ("[1, 2][1]", "2"),
        ("'héllo'[1:3]", "'él'"),
        ("(1, 2, 3)[:2]", "(1, 2)"),
        ("NaN == NaN", "0"),
        ("INF > 10 ** 18", "1"),
        ("0 || 'x'", "'x'"),
        ("'' && 1", "''"),
        ("[] || null", "null"),
        ("", "null"),
    ];

    for (input, expected) in tests {
        assert_eq!(run_ok(input), expected, "{}", input);
    }
}

#[test]
fn test_division() {
    assert_eq!(run_ok("7 / 2"), "3.5");
    assert_eq!(run_ok("7 // 2"), "3");
    assert_eq!(run_ok("7.0 // 2"), "3.0");
    assert_eq!(run_ok("-7 % 3"), "2");
    assert!(matches!(run_err("7 % 0"), ErrorKind::ZeroDivision(_)));
    assert!(matches!(run_err("7 / 0.0"), ErrorKind::ZeroDivision(_)));
}

#[test]
fn test_tuple_vs_grouping() {
    assert_eq!(run_ok("(1)"), "1");
    assert_eq!(run_ok("(1,)"), "(1,)");
    assert_eq!(run_ok("(1, 2)"), "(1, 2)");
    assert_eq!(run_ok("len((1, 2))"), "2");
    assert_eq!(run_ok("()"), "()");
}

#[test]
fn test_undefined_name() {
    use crate::lang::parse::parse;

    assert!(parse("undefinedName").is_ok());
    assert_eq!(run_err("undefinedName"), ErrorKind::Name("undefinedName".to_string()));
    assert_eq!(run_err("x += 1"), ErrorKind::Name("x".to_string()));
    assert_eq!(run_err("x++"), ErrorKind::Name("x".to_string()));
}

#[test]
fn test_short_circuit() {
    use std::cell::Cell;

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let side_effect = Value::native("sideEffect", Some(0), move |_| {
        counter.set(counter.get() + 1);
        Ok(Value::Integer(1))
    });

    let tests = vec![
        ("false && sideEffect()", "0", 0),
        ("true || sideEffect()", "1", 0),
        ("true && sideEffect()", "1", 1),
        ("false || sideEffect()", "1", 1),
        ("0 ? sideEffect() : 2", "2", 0),
    ];

    for (input, expected, count) in tests {
        calls.set(0);
        let bindings = vec![("sideEffect".to_string(), side_effect.clone())];
        let val = run_with(input, bindings, 64).expect("eval failed");
        assert_eq!(val.repr(), expected, "{}", input);
        assert_eq!(calls.get(), count, "{}", input);
    }
}

#[test]
fn test_compound_assignment() {
    let tests = vec![
        ("x = 5; x += 3; x", "8"),
        ("x = 5; x = x + 3; x", "8"),
        ("x = 5; x -= 7", "-2"),
        ("x = 3; x *= 'ab'", "'ababab'"),
        ("x = 7; x /= 2", "3.5"),
        ("x = 7; x //= 2", "3"),
        ("x = 7; x %= 4", "3"),
        ("x = 2; x **= 10", "1024"),
        ("x = 1; x <<= 4; x >>= 1", "8"),
        ("x = 6; x &= 3", "2"),
        ("x = 6; x ^= 3", "5"),
        ("x = 6; x |= 1", "7"),
        ("x = [1]; y = x; x += [2]; y", "[1]"),
        ("x = y = 4; x + y", "8"),
    ];

    for (input, expected) in tests {
        assert_eq!(run_ok(input), expected, "{}", input);
    }

    // The target is read once even when the right hand side rebinds it
    assert_eq!(run_ok("x = 1; f = () { x = 100; 1 }; x += f(); x"), "2");
}

#[test]
fn test_increment() {
    let tests = vec![
        ("x = 1; ++x", "2"),
        ("x = 1; x++", "1"),
        ("x = 1; x++; x", "2"),
        ("x = 1; --x + x--", "0"),
        ("x = 1.5; x++; x", "2.5"),
    ];

    for (input, expected) in tests {
        assert_eq!(run_ok(input), expected, "{}", input);
    }

    assert!(matches!(run_err("x = 'a'; x++"), ErrorKind::Type(_)));
    assert!(matches!(run_err("x = 9223372036854775807; x++"), ErrorKind::Overflow(_)));
}

#[test]
fn test_if() {
    let tests = vec![
        ("x = 3; if (x == 3) 'yep'", "'yep'"),
        ("x = 3; if (x != 3) 'yep' else 'nope'", "'nope'"),
        ("x = 3; if (x != 3) { 'a' } elif (x == 3) { 'b' } else { 'c' }", "'b'"),
        ("x = 3; if (x != 3) { 'a' } elif (x == 4) { 'b' }", "null"),
        ("x = 3\nif (x == 3) {\n  x = 4\n}\nelse {\n  x = 5\n}\nx", "4"),
    ];

    for (input, expected) in tests {
        assert_eq!(run_ok(input), expected, "{}", input);
    }
}

#[test]
fn test_loop() {
    let tests = vec![
        ("x = 0; while (x < 5) { if (x == 3) break; x = x + 1 }; x", "3"),
        ("x = 0; n = 0; while (x < 5) { x++; if (x % 2) continue; n++ }; n", "2"),
        ("total = 0; for (i in range(5)) total += i; total", "10"),
        ("s = ''; for (c in 'abc') s = c + s; s", "'cba'"),
        ("n = 0; for (x in {1, 2, 3}) { if (x == 2) break; n += x }; n", "1"),
        ("while (0) 1", "null"),
        ("xs = [1, 2]; for (x in xs) append(xs, x); xs", "[1, 2, 1, 2]"),
    ];

    for (input, expected) in tests {
        assert_eq!(run_ok(input), expected, "{}", input);
    }

    assert!(matches!(run_err("for (x in 5) x"), ErrorKind::Type(_)));
}

#[test]
fn test_scoping() {
    // Bindings created in a body are discarded
    assert_eq!(
        run_err("x = 0; while (x < 1) { inner = 3; x++ }; inner"),
        ErrorKind::Name("inner".to_string())
    );
    assert_eq!(
        run_err("if (1) fresh = 1; fresh"),
        ErrorKind::Name("fresh".to_string())
    );
    assert_eq!(run_err("for (i in [1]) 0; i"), ErrorKind::Name("i".to_string()));
    assert_eq!(run_err("{ y = 1 }; y"), ErrorKind::Name("y".to_string()));

    // ...unless already bound outside
    assert_eq!(run_ok("x = 0; while (x < 3) { x = x + 1 }; x"), "3");
    assert_eq!(run_ok("y = 0; { y = 1 }; y"), "1");

    // Parameters shadow rather than assign
    assert_eq!(run_ok("x = 1; f = (x) { x = 2 }; f(0); x"), "1");
}

#[test]
fn test_closures() {
    let prog = r#"
        make_counter = () {
            count = 0
            () { count += 1 }
        }
        a = make_counter()
        b = make_counter()
        a(); a()
        (a(), b())
    "#;
    assert_eq!(run_ok(prog), "(3, 1)");

    // Closures sharing a frame see each other's writes
    let prog = r#"
        make = () {
            n = 0
            [() { n += 10 }, () { n }]
        }
        fs = make()
        fs[0]()
        fs[1]()
    "#;
    assert_eq!(run_ok(prog), "10");

    // Lexical, not dynamic, scoping
    let prog = r#"
        x = 'global'
        show = () { x }
        f = () { x = 'local to f?'; show() }
        g = (x) { show() }
        g('param')
    "#;
    assert_eq!(run_ok(prog), "'global'");
}

#[test]
fn test_functions() {
    let tests = vec![
        ("add = (a, b) { a + b }; add(2, 3)", "5"),
        ("f = () { }; f()", "null"),
        ("f = (n) { if (n > 0) return 'pos'; 'other' }; (f(1), f(-1))", "('pos', 'other')"),
        ("f = () { for (i in range(10)) if (i == 4) return i }; f()", "4"),
        ("f = () { return }; f()", "null"),
        (
            "fib = (n) { n < 2 ? n : fib(n - 1) + fib(n - 2) }; fib(15)",
            "610",
        ),
        ("((x) { x * 2 })(21)", "42"),
        ("type(len)", "'function'"),
    ];

    for (input, expected) in tests {
        assert_eq!(run_ok(input), expected, "{}", input);
    }

    assert!(matches!(run_err("f = (a) { a }; f()"), ErrorKind::Type(_)));
    assert!(matches!(run_err("f = (a) { a }; f(1, 2)"), ErrorKind::Type(_)));
    assert!(matches!(run_err("x = 1; x()"), ErrorKind::Type(_)));
}

#[test]
fn test_recursion_limit() {
    assert_eq!(
        run_err("f = (n) { f(n + 1) }; f(0)"),
        ErrorKind::Recursion(64)
    );
    // Nested blocks count too
    let nested = format!("{}1{}", "{".repeat(40), "}".repeat(40));
    assert_eq!(
        run_with(&nested, vec![], 32).unwrap_err().kind,
        ErrorKind::Recursion(32)
    );

    // Depth is released on the way out, including after an error
    let val = run_with(
        "f = (n) { n == 0 ? 0 : f(n - 1) }; f(50); f(50)",
        vec![],
        64,
    );
    assert_eq!(val.unwrap(), Value::Integer(0));
}

#[test]
fn test_shared_collections() {
    assert_eq!(run_ok("a = [1]; b = a; append(b, 2); a"), "[1, 2]");
    assert_eq!(run_ok("s = {1}; t = s; add(t, 2); s"), "{1, 2}");
    assert_eq!(run_ok("a = [1]; b = a[:]; append(b, 2); a"), "[1]");
    assert_eq!(run_ok("f = (xs) { append(xs, 0) }; l = []; f(l); f(l); len(l)"), "2");

    // A list may contain itself
    assert_eq!(run_ok("a = [1]; append(a, a); a"), "[1, [...]]");
    assert_eq!(run_ok("a = []; append(a, a); b = []; append(b, b); a == b"), "1");
    assert!(matches!(run_err("xs = [[1]]; remove(xs, xs)"), ErrorKind::Value(_)));
    assert_eq!(run_ok("xs = [[1], 2]; remove(xs, [1]); xs"), "[2]");
}

#[test]
fn test_runtime_errors() {
    assert!(matches!(run_err("[1, 2][5]"), ErrorKind::Index(_)));
    assert!(matches!(run_err("[1, 2][-1]"), ErrorKind::Index(_)));
    assert!(matches!(run_err("s = {1}; s[0]"), ErrorKind::Type(_)));
    assert!(matches!(run_err("s = {[1]}"), ErrorKind::Type(_)));
    assert!(matches!(run_err("'1' + 1"), ErrorKind::Type(_)));
    assert!(matches!(run_err("9223372036854775807 + 1"), ErrorKind::Overflow(_)));
    assert_eq!(run_ok("-9223372036854775808"), "-9223372036854775808");
    assert_eq!(run_ok("-9223372036854775808 ** 1"), "-9223372036854775808");
    assert!(matches!(run_err("remove({1}, 2)"), ErrorKind::Key(_)));
}

#[test]
fn test_error_positions() {
    let err = run("x = 1\ny = x + z").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Name("z".to_string()));
    assert_eq!(err.pos, Some(crate::lang::token::Position::new(2, 1, 6)));

    // Errors inside a function point into the function body
    let err = run("f = () {\n  1 / 0\n}\nf()").unwrap_err();
    assert_eq!(err.pos, Some(crate::lang::token::Position::new(2, 3, 11)));
}
