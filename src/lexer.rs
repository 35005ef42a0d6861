use crate::error::Span;
use crate::token::{Token, TokenKind};

/// Single-token-lookahead tokenizer over one expression.
///
/// The lexer never fails: characters the grammar does not know are returned
/// as [`TokenKind::Unknown`] and consumed, leaving recovery to the parser.
pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: u32,
    col_base: u32,
    current: Token,
}

impl<'src> Lexer<'src> {
    /// Creates a lexer over `source`, which starts at `line:col` in the file,
    /// and reads the first token.
    pub fn new(source: &'src str, line: u32, col: u32) -> Self {
        let mut lexer = Self {
            source: source.as_bytes(),
            pos: 0,
            line,
            col_base: col,
            current: Token::new(TokenKind::Eof, Span::new(line, col, 0)),
        };
        lexer.advance();
        lexer
    }

    /// The lookahead token.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Replaces the lookahead with the next token. At the end of input the
    /// lookahead stays [`TokenKind::Eof`].
    pub fn advance(&mut self) {
        self.current = self.scan_token();
    }

    /// Drains the remaining tokens, including the final `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.current.clone();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
            self.advance();
        }
        tokens
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;
        if self.is_at_end() {
            return Token::new(TokenKind::Eof, self.span_from(start));
        }

        let byte = self.peek();

        if byte.is_ascii_digit()
            || (byte == b'-' && self.peek_next().is_some_and(|b| b.is_ascii_digit()))
        {
            return self.scan_number(start);
        }

        if byte.is_ascii_alphabetic() || byte == b'_' {
            return self.scan_identifier(start);
        }

        self.advance_byte();
        let kind = match byte {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            _ => {
                // Swallow the rest of a multi-byte character so spans stay on
                // UTF-8 boundaries.
                while !self.is_at_end() && (self.peek() & 0xC0) == 0x80 {
                    self.advance_byte();
                }
                TokenKind::Unknown(self.text(start).to_string())
            }
        };
        Token::new(kind, self.span_from(start))
    }

    fn scan_number(&mut self, start: usize) -> Token {
        if self.peek() == b'-' {
            self.advance_byte();
        }
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance_byte();
        }

        let text = self.text(start);
        let kind = match text.parse::<i64>() {
            Ok(value) => TokenKind::Number(value),
            Err(_) => TokenKind::Unknown(text.to_string()),
        };
        Token::new(kind, self.span_from(start))
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while !self.is_at_end() && is_ident_byte(self.peek()) {
            self.advance_byte();
        }
        let name = self.text(start).to_string();
        Token::new(TokenKind::Ident(name), self.span_from(start))
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_ascii_whitespace() {
            self.advance_byte();
        }
    }

    fn text(&self, start: usize) -> &'src str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("?")
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(
            self.line,
            self.col_base + start as u32,
            (self.pos - start) as u32,
        )
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.source[self.pos]
    }

    #[inline(always)]
    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    #[inline(always)]
    fn advance_byte(&mut self) {
        self.pos += 1;
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

#[inline]
fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Whether `name` would lex as a single identifier token.
pub fn is_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.first() {
        Some(&first) if first.is_ascii_alphabetic() || first == b'_' => {
            bytes[1..].iter().all(|&b| is_ident_byte(b))
        }
        _ => false,
    }
}
