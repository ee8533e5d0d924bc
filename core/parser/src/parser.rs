//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Builds an `Expression` tree from the lexer's tokens.
//! CONTEXT: Second stage of the pipeline. Binary operators are handled by
//! precedence climbing over `BinaryOperator::precedence`, which yields the
//! same trees as the textbook grammar:
//!
//!   expression     --> additive
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("-" | "+") unary | primary
//!   primary        --> NUMBER | IDENTIFIER | "(" expression ")"

use std::fmt;

use crate::ast::{BinaryOperator, Expression};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
    /// Byte offset of the offending token.
    pub offset: usize,
}

impl ParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest nesting of parentheses and signs the parser will follow.
pub const MAX_NESTING: usize = 256;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Parser {
            lexer,
            current,
            depth: 0,
        }
    }

    /// Parses the whole input as one expression.
    pub fn parse(mut self) -> ParseResult<Expression> {
        if self.current.is_end() {
            return Err(ParseError::new(self.current.offset, "Empty expression"));
        }

        let expr = self.parse_binary(1)?;

        if !self.current.is_end() {
            return Err(ParseError::new(
                self.current.offset,
                format!("Unexpected {} after expression", self.current.kind),
            ));
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn current_operator(&self) -> Option<BinaryOperator> {
        match self.current.kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            _ => None,
        }
    }

    /// Parses operands joined by operators binding at least as tightly as
    /// `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expression> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.current_operator() {
            if op.precedence() < min_precedence {
                break;
            }
            self.advance();
            // +1 keeps equal-precedence chains left-associative
            let rhs = self.parse_binary(op.precedence() + 1)?;
            lhs = Expression::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// Every operand passes through here, so nesting is bounded in one place.
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                self.current.offset,
                format!("Expression nested deeper than {} levels", MAX_NESTING),
            ));
        }

        self.depth += 1;
        let result = self.parse_signed();
        self.depth -= 1;
        result
    }

    fn parse_signed(&mut self) -> ParseResult<Expression> {
        match self.current.kind {
            TokenKind::Minus => {
                self.advance();
                Ok(Expression::negate(self.parse_unary()?))
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let Token { kind, offset } = self.advance();
        match kind {
            TokenKind::Number(n) => Ok(Expression::Number(n)),
            TokenKind::Ident(name) => {
                if self.current.kind == TokenKind::OpenParen {
                    return Err(ParseError::new(
                        offset,
                        format!("Function calls are not supported: {}", name),
                    ));
                }
                Ok(Expression::Identifier(name))
            }
            TokenKind::OpenParen => {
                let inner = self.parse_binary(1)?;
                if self.current.kind != TokenKind::CloseParen {
                    return Err(ParseError::new(
                        self.current.offset,
                        format!("Expected ')', found {}", self.current.kind),
                    ));
                }
                self.advance();
                Ok(inner)
            }
            TokenKind::End => Err(ParseError::new(offset, "Unexpected end of expression")),
            other => Err(ParseError::new(offset, format!("Unexpected {}", other))),
        }
    }
}

pub fn parse(source: &str) -> ParseResult<Expression> {
    Parser::new(source).parse()
}
