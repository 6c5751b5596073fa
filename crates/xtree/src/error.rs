//! Error types for xtree

use std::fmt;
use thiserror::Error;

/// Position in source input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The event source failed without reporting a diagnostic
    ParsingFailed,
    /// The document root has no element child
    RootElementMissing,
    /// No child element with the requested name
    ElementNotFound { name: String },
    InvalidToken,
    UnexpectedEof,
    MismatchedTag { expected: String, found: String },
    DuplicateAttribute { name: String },
    InvalidEntity { name: String },
    InvalidUtf8,
    UnboundPrefix { prefix: String },
    ExternalEntity { system_id: String },
    MaxDepthExceeded { max: u16 },
    MaxSizeExceeded { max: usize },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParsingFailed => write!(f, "parsing failed"),
            Self::RootElementMissing => write!(f, "root element missing"),
            Self::ElementNotFound { name } => write!(f, "element not found: {name}"),
            Self::InvalidToken => write!(f, "invalid token"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::MismatchedTag { expected, found } => {
                write!(f, "mismatched closing tag: expected </{expected}>, found </{found}>")
            }
            Self::DuplicateAttribute { name } => write!(f, "duplicate attribute: {name}"),
            Self::InvalidEntity { name } => write!(f, "invalid entity reference: &{name};"),
            Self::InvalidUtf8 => write!(f, "invalid utf-8"),
            Self::UnboundPrefix { prefix } => write!(f, "unbound namespace prefix: {prefix}"),
            Self::ExternalEntity { system_id } => {
                write!(f, "failed to load external entity: {system_id}")
            }
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
        }
    }
}

/// Main error type for xtree
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Generic failure used when the event source gives no diagnostic
    pub fn parsing_failed() -> Self {
        Self::new(ErrorKind::ParsingFailed, Span::empty())
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create error at specific position
    pub fn at(kind: ErrorKind, pos: Pos) -> Self {
        Self::new(kind, Span::at(pos))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span == Span::empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "error at {}: {}", self.span.start, self.message)
        }
    }
}

/// Result type alias for xtree
pub type Result<T> = std::result::Result<T, Error>;
