use std::io;

use thiserror::Error;

use pire_parser::Span;

/// Errors returned while building automata and scanners, or while using
/// them.
///
/// Every fallible operation is transactional: when an error is returned
/// the receiver is left exactly as it was before the call.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The pattern is not a valid regular expression.
    #[error("syntax error: {message}")]
    SyntaxError {
        /// Description of the problem.
        message: String,
        /// Location of the problem within the pattern, when known.
        span: Option<Span>,
    },

    /// Some argument is not acceptable for the operation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Some value or combined artifact exceeds its representable width.
    #[error("overflow: {0}")]
    Overflow(String),

    /// A saved scanner can't be loaded.
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    /// The input is not something the scanner can be driven with.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// I/O error while saving or loading a scanner.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error returned when a saved scanner can't be loaded.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DataFormatError {
    /// The data doesn't start with the expected header.
    #[error("not a saved scanner")]
    InvalidFormat,

    /// The data was saved by an incompatible version of this crate.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),

    /// The data contains a different kind of scanner.
    #[error("expecting a {expected} scanner, found {found}")]
    KindMismatch {
        /// Kind of scanner being loaded.
        expected: &'static str,
        /// Kind of scanner found in the data.
        found: String,
    },

    /// The payload can't be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(#[from] bincode::Error),

    /// The payload was decoded, but its tables are not consistent.
    #[error("inconsistent scanner: {0}")]
    Inconsistent(&'static str),
}

impl From<pire_parser::Error> for Error {
    fn from(err: pire_parser::Error) -> Self {
        let span = err.span().clone();
        Error::SyntaxError { message: err.to_string(), span: Some(span) }
    }
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Error::SyntaxError { message: message.into(), span: None }
    }

    pub(crate) fn too_many_states(limit: usize) -> Self {
        Error::Overflow(format!(
            "automaton exceeds the maximum number of states ({})",
            limit
        ))
    }
}
