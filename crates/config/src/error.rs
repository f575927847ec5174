//! Configuration Error Types
//!
//! Structured errors using `exn` for automatic location tracking. Every kind
//! here is fatal: configuration is validated eagerly at startup and nothing
//! is ever silently defaulted.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No file exists at the configured path. The binary reacts by writing
    /// a complete default config there and exiting.
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Only `.json` and `.toml` config files are understood.
    #[display("unsupported config format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The file exists but does not deserialize into the expected document.
    #[display("malformed configuration")]
    Malformed,
    /// A key deserialized but its value does not validate.
    #[display("invalid value for {key}: {value:?}")]
    InvalidValue {
        key: &'static str,
        #[error(not(source))]
        value: String,
    },
    /// Failed to read or write the config file itself.
    #[display("config file I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
