//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Splits an arithmetic string into offset-tagged tokens.
//! CONTEXT: First stage of the pipeline. Numbers and identifiers are
//! sliced straight out of the source; anything outside the arithmetic
//! alphabet becomes `TokenKind::Unknown` and is rejected by the parser.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    /// Returns the next token. Once the input is exhausted every call
    /// yields `TokenKind::End`.
    pub fn next_token(&mut self) -> Token {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        let Some((offset, ch)) = self.chars.next() else {
            return Token::new(TokenKind::End, self.source.len());
        };

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            c if c.is_ascii_digit() || c == '.' => self.number(offset, c),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.consume_while(offset, |c| c.is_ascii_alphanumeric() || c == '_');
                TokenKind::Ident(name.to_string())
            }
            other => TokenKind::Unknown(other),
        };

        Token::new(kind, offset)
    }

    /// Collects every token up to and including `End`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_end();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn number(&mut self, start: usize, first: char) -> TokenKind {
        let mut seen_dot = first == '.';
        let text = self.consume_while(start, |c| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                true
            } else {
                c.is_ascii_digit()
            }
        });

        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            // a lone "."
            Err(_) => TokenKind::Unknown(first),
        }
    }

    /// Consumes characters accepted by `accept` and returns the source
    /// slice from `start` (the already consumed first character) onwards.
    fn consume_while(&mut self, start: usize, mut accept: impl FnMut(char) -> bool) -> &'a str {
        while self.chars.next_if(|&(_, c)| accept(c)).is_some() {}
        let end = self.chars.peek().map_or(self.source.len(), |&(i, _)| i);
        &self.source[start..end]
    }
}
