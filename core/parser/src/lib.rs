//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the calculated-field expression parser.
//! CONTEXT: This crate converts an arithmetic string into an expression tree
//! and evaluates that tree. It knows nothing about form fields; identifiers
//! are substituted with numbers by the engine before parsing.
//!
//! PIPELINE: Expression String --> Lexer --> Tokens --> Parser --> AST --> evaluate
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /
//! - Unary sign: -5, +5, -(2 + 3)
//! - Errors carry the byte offset of the offending token
//! - Parentheses for grouping, nested at most `MAX_NESTING` deep
//! - Decimal literals: 12, 12.5, .5

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;


pub use ast::{BinaryOperator, Expression};
pub use eval::{evaluate, EvalError, EvalResult};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser, MAX_NESTING};
pub use token::{Token, TokenKind};
