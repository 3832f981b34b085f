pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lex;
pub mod parse;
pub mod runtime;
pub mod semantics;
pub mod token;
pub mod variables;
