//! Archive Error Types
//!
//! Structured errors using `exn` for automatic location tracking. Pattern,
//! policy, and time-block kinds are configuration-time failures and abort
//! startup; `Storage` wraps filesystem failures raised by ingestion and
//! retention, which their callers recover per file.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The naming pattern, prefix, or suffix would inject path components
    /// into generated names.
    #[display("invalid naming pattern: {_0}")]
    Pattern(#[error(not(source))] String),
    /// A record timestamp cannot be rendered as a calendar date.
    #[display("timestamp out of renderable range: {_0}")]
    Timestamp(#[error(not(source))] u64),
    /// Unrecognized missing-file policy name.
    #[display("unknown missing-file policy: {_0:?}")]
    Policy(#[error(not(source))] String),
    /// Two time blocks share the same age threshold.
    #[display("duplicate time block threshold: {_0}s")]
    DuplicateThreshold(#[error(not(source))] u64),
    /// A time block's file count division must be at least 1.
    #[display("time block at {_0}s has a division of zero")]
    ZeroDivision(#[error(not(source))] u64),
    /// A storage operation failed during ingestion or retention.
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
