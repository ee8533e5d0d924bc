//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Expression tree produced by the parser.
//! CONTEXT: Unary plus is dropped while parsing, so the tree only holds
//! literals, identifiers, negation and the four binary operators.

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Number(f64),
    /// Kept so errors can name it. Evaluating one is an error, since the
    /// engine substitutes every field before parsing.
    Identifier(String),
    Negate(Box<Expression>),
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn negate(operand: Expression) -> Self {
        Expression::Negate(Box::new(operand))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter. All operators are
    /// left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply | BinaryOperator::Divide => 2,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOperator::Add => lhs + rhs,
            BinaryOperator::Subtract => lhs - rhs,
            BinaryOperator::Multiply => lhs * rhs,
            BinaryOperator::Divide => lhs / rhs,
        }
    }
}

/// Fully parenthesized, so the output shows how the input was grouped.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::Identifier(name) => f.write_str(name),
            Expression::Negate(operand) => write!(f, "-{}", operand),
            Expression::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}
