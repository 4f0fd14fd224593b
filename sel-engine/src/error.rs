use std::io;

use thiserror::Error;

use crate::types::Type;

/// Byte range into the text being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// 1-based line and column of the span start within `source`.
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let before = &source[..self.offset.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map(|at| before[at + 1..].chars().count())
            .unwrap_or_else(|| before.chars().count())
            + 1;
        (line, column)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    Parse { message: String, span: Span },

    #[error("type mismatch: expected {to} but got {from}")]
    TypeMismatch { from: Type, to: Type },

    #[error("cannot coerce from {from} to {to}")]
    Coercion { from: Type, to: Type },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, span: Span) -> Self {
        Error::Parse {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse { span, .. } => Some(*span),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
