//! # Error Module
//!
//! Diagnostics for every stage of the compiler. Compile-time errors are
//! collected rather than raised, so a single run can report all of them and
//! still produce an assembly listing. Every error carries an optional source
//! location for caret rendering.

use std::fmt;

// -----------------------------------------------------------------------------
// SPAN
// -----------------------------------------------------------------------------

/// A position in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// 1-based line number in the source file.
    pub line: u32,
    /// 1-based column number in the source line.
    pub col: u32,
    /// Length of the spanned region in bytes.
    pub len: u32,
}

impl Span {
    /// Creates a new span at the given location.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A span covering a whole line, used for statement-level errors.
    #[inline]
    pub fn line(line: u32) -> Self {
        Self::new(line, 1, 0)
    }
}

// -----------------------------------------------------------------------------
// ERROR KIND
// -----------------------------------------------------------------------------

/// Classifies a diagnostic by the recovery it received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad token inside an expression. Recovered in place.
    Parse,
    /// Malformed statement, unknown variable, invalid patch index or
    /// invalid configuration. The statement contributes no further code.
    Structural,
    /// Instruction buffer, variable table or scratch region exhausted.
    Capacity,
    /// Failure while simulating a compiled program.
    Runtime,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "ParseError"),
            ErrorKind::Structural => write!(f, "StructuralError"),
            ErrorKind::Capacity => write!(f, "CapacityError"),
            ErrorKind::Runtime => write!(f, "RuntimeError"),
        }
    }
}

// -----------------------------------------------------------------------------
// COMPILE ERROR
// -----------------------------------------------------------------------------

/// The single error type shared by the compiler and the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// What went wrong, broadly.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Source location, when one is known.
    pub span: Option<Span>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn no_span(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    #[inline]
    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Parse, message, span)
    }

    #[inline]
    pub fn structural(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Structural, message, span)
    }

    #[inline]
    pub fn structural_no_span(message: impl Into<String>) -> Self {
        Self::no_span(ErrorKind::Structural, message)
    }

    /// Capacity errors are raised deep inside emission, where no source
    /// position is known; the driver attaches the statement line afterwards.
    #[inline]
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::no_span(ErrorKind::Capacity, message)
    }

    #[inline]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::no_span(ErrorKind::Runtime, message)
    }

    /// Attaches `span` unless the error already has a more precise one.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(
                f,
                "{} [line {}:{}]: {}",
                self.kind, span.line, span.col, self.message
            ),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CompileError {}

pub type CompileResult<T> = std::result::Result<T, CompileError>;

// -----------------------------------------------------------------------------
// RENDERING
// -----------------------------------------------------------------------------

/// Renders `err` against the source text, pointing a caret at the
/// offending column when the error has a span inside the file.
pub fn format_error(err: &CompileError, source: &str, path: &str) -> String {
    let Some(span) = err.span else {
        return format!("{path}: {err}");
    };

    let Some(text) = source.lines().nth(span.line.saturating_sub(1) as usize) else {
        return format!("{path}:{}: {err}", span.line);
    };

    let gutter = span.line.to_string();
    let pad = " ".repeat(gutter.len());
    let caret_col = span.col.saturating_sub(1) as usize;
    let carets = "^".repeat(span.len.max(1) as usize);

    format!(
        "{path}:{}:{}: {err}\n{pad} |\n{gutter} | {text}\n{pad} | {}{carets}",
        span.line,
        span.col,
        " ".repeat(caret_col),
    )
}
