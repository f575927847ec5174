//! Magnitude Parsing Error Types
//!
//! Structured errors using `exn` for automatic location tracking. Every kind
//! here is fatal when reached from configuration loading: a magnitude string
//! the operator wrote by hand must never be silently defaulted.

use derive_more::{Display, Error};

/// A magnitude parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for magnitude parsing.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The string is not `<non-negative integer><unit char>`.
    #[display("invalid magnitude format: {_0:?}")]
    InvalidFormat(#[error(not(source))] String),
    /// The numeric prefix parsed but the unit character is not recognized.
    #[display("unknown magnitude unit {_0:?}")]
    UnknownUnit(#[error(not(source))] char),
    /// The value does not fit in 64 bits after unit multiplication.
    #[display("magnitude overflows 64 bits: {_0:?}")]
    Overflow(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
