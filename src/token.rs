//! # Token Module
//!
//! Token types for the expression language. Tokens are produced one at a
//! time by the lexer and consumed by the code generator. Each token carries
//! a [`Span`] for diagnostics.

use crate::error::Span;

// -----------------------------------------------------------------------------
// TOKEN KIND
// -----------------------------------------------------------------------------

/// Every lexical category of the expression grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Integer literal. A `-` directly followed by a digit is folded into it.
    Number(i64),
    /// Variable name.
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// End of the expression text.
    Eof,
    /// Anything the grammar has no use for. Holds the consumed text.
    Unknown(String),
}

impl TokenKind {
    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Eof => "end of expression".to_string(),
            TokenKind::Unknown(text) => text.clone(),
        }
    }
}

// -----------------------------------------------------------------------------
// TOKEN
// -----------------------------------------------------------------------------

/// A token with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
