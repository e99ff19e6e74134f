//! Lazy tokenizer for arithmetic source text.

use std::fmt;

use crate::error::{CompileError, CompileResult};

/// Half-open byte range into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number(i32),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    EndOfInput,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(v) => write!(f, "number {v}"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::EndOfInput => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Produces tokens on demand, finishing with a single `EndOfInput`.
///
/// The first illegal character or oversized literal is yielded as an error and
/// the iterator is exhausted afterwards; compilation is expected to abort.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Construct a lexer over a slice of source.
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, done: false }
    }

    /// Rewind to the beginning of the source.
    pub fn restart(&mut self) {
        self.pos = 0;
        self.done = false;
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    fn skip_whitespace(&mut self) {
        let b = self.src.as_bytes();
        while self.pos < b.len() && matches!(b[self.pos], b' ' | b'\t' | b'\r' | b'\n') {
            self.pos += 1;
        }
    }

    fn scan(&mut self) -> CompileResult<Token> {
        self.skip_whitespace();
        let b = self.src.as_bytes();
        let start = self.pos;
        if start >= b.len() {
            return Ok(Token { kind: TokenKind::EndOfInput, span: Span::new(start, start) });
        }

        // maximal run of decimal digits
        if b[start].is_ascii_digit() {
            while self.pos < b.len() && b[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            let literal = &self.src[start..self.pos];
            let value = literal.parse::<i32>().map_err(|_| CompileError::NumberOverflow {
                position: start,
                literal: literal.to_string(),
            })?;
            return Ok(Token { kind: TokenKind::Number(value), span: Span::new(start, self.pos) });
        }

        let kind = match b[start] {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            _ => {
                let ch = self.src[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(CompileError::Lex { ch, position: start });
            }
        };
        self.pos += 1;
        Ok(Token { kind, span: Span::new(start, self.pos) })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = CompileResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tok = self.scan();
        match &tok {
            Ok(Token { kind: TokenKind::EndOfInput, .. }) | Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(tok)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Collect every token of `src`, stopping at the first error.
pub fn tokenize(src: &str) -> CompileResult<Vec<Token>> {
    Lexer::new(src).collect()
}
