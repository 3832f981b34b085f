//! This module implements the structural checks run on the AST right after parsing.
//!
//! The language is duck typed so there is nothing to type check; names are resolved at run time
//! too. What is left are rules the grammar cannot express on its own:
//!
//! * `break` and `continue` only inside a loop
//! * `return` only inside a function body
//! * no repeated parameter names
//!
//! A function body starts a fresh loop context: a `break` in a function defined inside a loop
//! does not refer to that loop.

use std::collections::HashSet;

use crate::lang::ast::*;
use crate::lang::error::SyntaxError;
use crate::lang::token::Position;

type Result<T> = std::result::Result<T, SyntaxError>;

pub struct SemanticAnalyzer {
    loop_depth: u32,
    function_depth: u32,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            loop_depth: 0,
            function_depth: 0,
        }
    }

    fn analyze_function(&mut self, def: &FunctionDef, pos: Position) -> Result<()> {
        let mut seen = HashSet::new();
        for param in &def.params {
            if !seen.insert(param) {
                return Err(SyntaxError::new(
                    format!("duplicate parameter '{}' in function definition", param),
                    pos,
                ));
            }
        }

        let saved_loop_depth = self.loop_depth;
        self.loop_depth = 0;
        self.function_depth += 1;

        let ret = self.analyze_stmts(&def.body.statements);

        self.function_depth -= 1;
        self.loop_depth = saved_loop_depth;

        ret
    }

    /// Expressions only matter for the function literals they contain
    fn analyze_expr(&mut self, expr: &Expression, pos: Position) -> Result<()> {
        match expr {
            Expression::Literal(_) | Expression::Identifier(_) | Expression::Postfix(_, _) => Ok(()),
            Expression::Unary(_, e) | Expression::Assignment(_, _, e) => self.analyze_expr(e, pos),
            Expression::Binary(_, lhs, rhs) | Expression::Index(lhs, rhs) => {
                self.analyze_expr(lhs, pos)?;
                self.analyze_expr(rhs, pos)
            }
            Expression::Ternary(cond, t, f) => {
                self.analyze_expr(cond, pos)?;
                self.analyze_expr(t, pos)?;
                self.analyze_expr(f, pos)
            }
            Expression::Call(func, args) => {
                self.analyze_expr(func, pos)?;
                args.iter().try_for_each(|a| self.analyze_expr(a, pos))
            }
            Expression::Slice(e, start, stop) => {
                self.analyze_expr(e, pos)?;
                if let Some(start) = start {
                    self.analyze_expr(start, pos)?;
                }
                if let Some(stop) = stop {
                    self.analyze_expr(stop, pos)?;
                }

                Ok(())
            }
            Expression::Collection(_, items) => {
                items.iter().try_for_each(|i| self.analyze_expr(i, pos))
            }
            Expression::Function(def) => self.analyze_function(def, pos),
        }
    }

    fn analyze_loop_body(&mut self, body: &Statement) -> Result<()> {
        self.loop_depth += 1;
        let ret = self.analyze_stmt(body);
        self.loop_depth -= 1;

        ret
    }

    fn analyze_stmt(&mut self, stmt: &Statement) -> Result<()> {
        match &stmt.kind {
            StatementKind::Expression(expr) => self.analyze_expr(expr, stmt.pos),
            StatementKind::Block(block) => self.analyze_stmts(&block.statements),
            StatementKind::If(cond, true_body, false_body) => {
                self.analyze_expr(cond, stmt.pos)?;
                self.analyze_stmt(true_body)?;
                match false_body {
                    Some(body) => self.analyze_stmt(body),
                    None => Ok(()),
                }
            }
            StatementKind::While(cond, body) => {
                self.analyze_expr(cond, stmt.pos)?;
                self.analyze_loop_body(body)
            }
            StatementKind::For(_, iterable, body) => {
                self.analyze_expr(iterable, stmt.pos)?;
                self.analyze_loop_body(body)
            }
            StatementKind::Break | StatementKind::Continue => {
                if self.loop_depth == 0 {
                    let jump = match stmt.kind {
                        StatementKind::Break => "break",
                        _ => "continue",
                    };
                    return Err(SyntaxError::new(
                        format!("`{}` outside of a loop", jump),
                        stmt.pos,
                    ));
                }

                Ok(())
            }
            StatementKind::Return(value) => {
                if self.function_depth == 0 {
                    return Err(SyntaxError::new("`return` outside of a function", stmt.pos));
                }

                match value {
                    Some(expr) => self.analyze_expr(expr, stmt.pos),
                    None => Ok(()),
                }
            }
        }
    }

    fn analyze_stmts(&mut self, stmts: &[Statement]) -> Result<()> {
        for stmt in stmts {
            self.analyze_stmt(stmt)?;
        }

        Ok(())
    }

    pub fn analyze(&mut self, program: &Program) -> Result<()> {
        self.analyze_stmts(&program.statements)
    }
}

/// Run the structural checks on a freshly parsed program
pub fn check(program: &Program) -> Result<()> {
    SemanticAnalyzer::new().analyze(program)
}

#[cfg(test)]
fn analyze(prog: &str) -> Result<()> {
    use crate::lang::parse::parse;
    // `parse` already runs `check`, so this is the full pipeline
    parse(prog).map(|_| ())
}

#[test]
fn test_jump_outside_loop() {
    {
        let prog = r#"
            break
        "#;
        assert!(analyze(prog).is_err());
    }
    {
        let prog = r#"
            if (1) { continue }
        "#;
        assert!(analyze(prog).is_err());
    }
    {
        let prog = r#"
            while (1) {
                break
                continue
            }
            for (x in [1]) { if (x) break }
        "#;
        assert!(analyze(prog).is_ok());
    }
    {
        // Function bodies do not see the enclosing loop
        let prog = r#"
            while (1) {
                f = () { break }
            }
        "#;
        assert!(analyze(prog).is_err());
    }
}

#[test]
fn test_return_outside_function() {
    {
        let prog = r#"
            return
        "#;
        assert!(analyze(prog).is_err());
    }
    {
        let prog = r#"
            f = (x) {
                while (x) { return 1 }
                g = () { return }
                return [() { return 2 }]
            }
        "#;
        assert!(analyze(prog).is_ok());
    }
}

#[test]
fn test_duplicate_params() {
    let err = parse_err("x = 1\nf = (a, b, a) { a }");
    assert_eq!(err.pos, Position::new(2, 1, 6));
    assert_eq!(
        err.message,
        "duplicate parameter 'a' in function definition"
    );

    assert!(analyze("f = (a, b) { (a, a) }").is_ok());
}

#[cfg(test)]
fn parse_err(prog: &str) -> SyntaxError {
    analyze(prog).unwrap_err()
}
