//! File name validation.
//!
//! The store is flat: every operation addresses a plain file name directly
//! under the root. Rejecting separators and traversal components here means
//! a generated name can never escape the archive directory, no matter what
//! the naming pattern expanded to.

use crate::error::{ErrorKind, Result};

/// Validate a flat file name for use inside a store.
///
/// Rejects empty names, `.`/`..`, and anything containing a path separator
/// or NUL byte.
///
/// # Examples
///
/// ```
/// use mothball_storage::validate_name;
///
/// assert!(validate_name("archive_2024_01_01.txt.gz").is_ok());
/// assert!(validate_name("../escape").is_err());
/// assert!(validate_name("nested/file").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    if name.contains(['/', '\\', '\0']) {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    Ok(name)
}
