//! FILENAME: core/parser/src/eval.rs
//! PURPOSE: Evaluates an arithmetic tree to an f64.
//! CONTEXT: Plain IEEE-754 arithmetic. Division by zero is not trapped
//! here; callers decide what a non-finite result means.

use std::fmt;

use crate::ast::Expression;

#[derive(Debug, PartialEq, Clone)]
pub enum EvalError {
    /// The tree still holds a name that was never substituted.
    UnresolvedIdentifier(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnresolvedIdentifier(name) => write!(f, "Unresolved identifier: {}", name),
        }
    }
}

impl std::error::Error for EvalError {}

pub type EvalResult<T> = Result<T, EvalError>;

pub fn evaluate(expr: &Expression) -> EvalResult<f64> {
    match expr {
        Expression::Number(n) => Ok(*n),
        Expression::Identifier(name) => Err(EvalError::UnresolvedIdentifier(name.clone())),
        Expression::Negate(operand) => evaluate(operand).map(|v| -v),
        Expression::Binary { op, lhs, rhs } => Ok(op.apply(evaluate(lhs)?, evaluate(rhs)?)),
    }
}
