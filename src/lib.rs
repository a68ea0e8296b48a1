// SEL Expression Language Library
//
// Lexing, parsing and tree-walking evaluation for a small expression
// language of literals, operators, attribute access, calls, subscripts
// and a ternary conditional, evaluated against a caller-supplied
// environment.

// Public modules
pub mod ast;
pub mod builtins;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{Expr, Index, Literal};
pub use error::{Error, EvalError, EvalErrorKind, Span, SyntaxError};
pub use evaluator::{Environment, Evaluator};
pub use host::{HostError, HostObject, HostResult, NativeFunction, SliceArgs};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;
pub use value::Value;

// Re-export the entry points
pub use evaluator::evaluate;
pub use lexer::tokenize;
pub use parser::{parse, parse_tokens};
