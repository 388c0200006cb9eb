use thiserror::Error;

use crate::Span;

/// Error occurred while parsing a regular expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{message} at {span}")]
    SyntaxError { message: String, span: Span },

    #[error("invalid escape sequence at {span}: {message}")]
    InvalidEscapeSequence { message: String, span: Span },

    #[error("invalid repetition at {span}: {message}")]
    InvalidRepetition { message: String, span: Span },

    #[error("invalid class range at {span}: {message}")]
    InvalidClassRange { message: String, span: Span },

    #[error("pattern exceeds the nesting limit ({limit}) at {span}")]
    NestingLimitExceeded { limit: u32, span: Span },
}

impl Error {
    /// Returns the span where the error occurred.
    pub fn span(&self) -> &Span {
        match self {
            Error::SyntaxError { span, .. }
            | Error::InvalidEscapeSequence { span, .. }
            | Error::InvalidRepetition { span, .. }
            | Error::InvalidClassRange { span, .. }
            | Error::NestingLimitExceeded { span, .. } => span,
        }
    }
}
