//! Expression Module - Text to evaluable math
//!
//! Everything between user-typed text and numbers on a scope:
//!
//! - **Ast** - Expression tree, free symbols, canonical display
//! - **Parser** - nom grammar (`+ - * / ^`, calls, parens)
//! - **Compile** - Validation, variable detection, the cached Compiler
//! - **Eval** - AST evaluation, builtin functions, the point Evaluator
//! - **Cache** - Bounded insert-ordered compiled-expression cache

mod ast;
mod cache;
mod compile;
mod eval;
mod parser;

pub use ast::*;
pub use cache::*;
pub use compile::*;
pub use eval::*;
pub use parser::parse_expression;
