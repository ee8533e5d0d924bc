//! FILENAME: core/parser/src/token.rs
//! PURPOSE: Token definitions for the arithmetic lexer.
//! CONTEXT: Every token carries the byte offset it starts at, so parse
//! errors can point into the substituted expression.

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    OpenParen,
    CloseParen,
    End,
    Unknown(char),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the source string.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Token { kind, offset }
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::OpenParen => f.write_str("'('"),
            TokenKind::CloseParen => f.write_str("')'"),
            TokenKind::End => f.write_str("end of input"),
            TokenKind::Unknown(c) => write!(f, "character '{}'", c),
        }
    }
}
