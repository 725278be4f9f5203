//! Tokenizers for the call-expression and JSON syntaxes.
//!
//! Both token sets are generated with `logos`. Whitespace is skipped; anything
//! the lexer cannot recognize is reported as a [`ToolCallError::Syntax`] at its
//! byte offset. Literal tokens carry no data: the parser slices their text from
//! the source so that literal conversion (and its failures) stays in the
//! translators.
//!
//! [`TokenStream`] is the cursor the hand-written recursive descent parsers walk.

use crate::error::{Result, ToolCallError};
use logos::Logos;
use std::fmt::Debug;

/// Tokens of the call-expression syntax (`f(a=1, b=[True, None])`).
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum CallToken {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token(":")]
    Colon,
    #[token("True")]
    TrueKw,
    #[token("False")]
    FalseKw,
    #[token("None")]
    NoneKw,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,
    #[regex(r"-?[0-9]+")]
    Int,
    #[regex(r"-?([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?")]
    #[regex(r"-?[0-9]+[eE][+-]?[0-9]+")]
    Float,
    /// Single- or double-quoted; a backslash escapes the next character.
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    Str,
}

/// Tokens of the JSON syntax.
///
/// Numbers are matched loosely so that text like `1.2.3` reaches the translator
/// and fails as a malformed literal instead of a syntax error.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum JsonToken {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[regex(r#""([^"\\\x00-\x1F]|\\.)*""#)]
    Str,
    #[regex(r"-?[0-9][0-9.eE+\-]*")]
    Number,
}

/// A token together with its source text and byte offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lexeme<'src, T> {
    pub token: T,
    pub text: &'src str,
    pub offset: usize,
}

/// Tokenize `source` completely, failing on the first unrecognized input.
pub fn tokenize<'src, T>(source: &'src str) -> Result<Vec<Lexeme<'src, T>>>
where
    T: Logos<'src, Source = str>,
    T::Extras: Default,
{
    let mut lexemes = Vec::new();
    for (token, span) in T::lexer(source).spanned() {
        match token {
            Ok(token) => lexemes.push(Lexeme {
                token,
                text: &source[span.clone()],
                offset: span.start,
            }),
            Err(_) => {
                return Err(ToolCallError::syntax(
                    span.start,
                    format!("unrecognized input `{}`", &source[span]),
                ))
            }
        }
    }
    Ok(lexemes)
}

/// Token cursor with lookahead for the recursive descent parsers.
pub(crate) struct TokenStream<'a, 'src, T> {
    lexemes: &'a [Lexeme<'src, T>],
    pos: usize,
    end_offset: usize,
}

impl<'a, 'src, T> TokenStream<'a, 'src, T>
where
    T: Copy + PartialEq + Debug,
{
    /// `end_offset` is reported for errors found past the last token
    /// (normally the source length).
    pub fn new(lexemes: &'a [Lexeme<'src, T>], end_offset: usize) -> Self {
        Self {
            lexemes,
            pos: 0,
            end_offset,
        }
    }

    pub fn peek(&self) -> Option<T> {
        self.lexemes.get(self.pos).map(|l| l.token)
    }

    pub fn advance(&mut self) -> Option<&'a Lexeme<'src, T>> {
        let lexeme = self.lexemes.get(self.pos);
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    pub fn check(&self, expected: T) -> bool {
        self.peek() == Some(expected)
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, expected: T) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, expected: T) -> Result<&'a Lexeme<'src, T>> {
        if self.check(expected) {
            if let Some(lexeme) = self.advance() {
                return Ok(lexeme);
            }
        }
        Err(self.unexpected(&format!("expected {:?}", expected)))
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    /// Byte offset of the current token, or the end offset when exhausted.
    pub fn offset(&self) -> usize {
        self.lexemes
            .get(self.pos)
            .map_or(self.end_offset, |l| l.offset)
    }

    pub fn unexpected(&self, context: &str) -> ToolCallError {
        let message = match self.lexemes.get(self.pos) {
            Some(lexeme) => format!("{}, found {:?} `{}`", context, lexeme.token, lexeme.text),
            None => format!("{}, found end of input", context),
        };
        ToolCallError::syntax(self.offset(), message)
    }
}
