//! Structured compiler diagnostics.
//!
//! Every stage from the lexer through the ELF writer reports failures through
//! [`CompileError`]. The five variants mirror the taxonomy the driver reports to the
//! user: the first error produced anywhere aborts the whole compilation, so there is
//! no notion of a "warning" or partial recovery here.

use std::fmt;
use std::path::PathBuf;

/// A location in the original source file, one-indexed like a text editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Unterminated literal, bad character, malformed number.
    #[error("{path}:{span}: lexical error: {message}")]
    Lexical {
        path: PathBuf,
        span: Span,
        message: String,
    },
    /// Unexpected token.
    #[error("{path}:{span}: syntax error: {message}")]
    Syntax {
        path: PathBuf,
        span: Span,
        message: String,
    },
    /// Undefined identifier, type mismatch, arity mismatch, member access on a
    /// non-struct, and similar checks that need more than one token of context.
    #[error("{path}:{span}: semantic error: {message}")]
    Semantic {
        path: PathBuf,
        span: Span,
        message: String,
    },
    /// An invariant the compiler itself is supposed to maintain was violated.
    /// Never caused by user input; always a compiler bug.
    #[error("internal compiler error: {message}")]
    Internal {
        message: String,
        ir_dump: Option<String>,
    },
    /// Cannot read the source or write the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexical(path: impl Into<PathBuf>, span: Span, message: impl Into<String>) -> Self {
        Self::Lexical {
            path: path.into(),
            span,
            message: message.into(),
        }
    }

    pub fn syntax(path: impl Into<PathBuf>, span: Span, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            span,
            message: message.into(),
        }
    }

    pub fn semantic(path: impl Into<PathBuf>, span: Span, message: impl Into<String>) -> Self {
        Self::Semantic {
            path: path.into(),
            span,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            ir_dump: None,
        }
    }

    /// Attach an IR dump, surfaced by the driver only when `-v` is set.
    pub fn with_ir_dump(mut self, dump: impl Into<String>) -> Self {
        if let Self::Internal { ir_dump, .. } = &mut self {
            *ir_dump = Some(dump.into());
        }
        self
    }

    /// A single-line rendering suitable for stderr, independent of `ir_dump`.
    pub fn diagnostic_line(&self) -> String {
        self.to_string()
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
