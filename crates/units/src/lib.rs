//! Human-readable magnitude parsing.
//!
//! Converts operator-facing strings such as `10B`, `256M`, or `2w` into
//! canonical integer units: bytes for [`DataSize`], seconds for [`TimeSpan`].
//! Both types parse via [`FromStr`] from a decimal integer followed by
//! exactly one unit character; everything else is rejected up front so that
//! configuration validation can fail fast.
//!
//! | Size unit | Multiplier | | Duration unit | Multiplier |
//! |---|---|---|---|---|
//! | `B` | 1 | | `S` | 1 |
//! | `K` | 1024 | | `M` | 60 |
//! | `M` | 1024² | | `H` | 3600 |
//! | `G` | 1024³ | | `d` | 86400 |
//! | | | | `w` | 604800 |
//! | | | | `m` | 2592000 (30-day month) |
//! | | | | `y` | 31536000 (365-day year) |

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use std::str::FromStr;

/// A byte count parsed from a `<integer><unit>` string.
///
/// # Examples
///
/// ```
/// use mothball_units::DataSize;
///
/// let size: DataSize = "1K".parse().unwrap();
/// assert_eq!(size.bytes(), 1024);
/// assert!("10".parse::<DataSize>().is_err());
/// assert!("-1B".parse::<DataSize>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataSize(u64);

impl DataSize {
    /// The parsed value in bytes.
    pub const fn bytes(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DataSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl FromStr for DataSize {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (value, unit) = split_magnitude(s)?;
        let multiplier: u64 = match unit {
            'B' => 1,
            'K' => 1 << 10,
            'M' => 1 << 20,
            'G' => 1 << 30,
            _ => exn::bail!(ErrorKind::UnknownUnit(unit)),
        };
        checked(value, multiplier, s).map(Self)
    }
}

/// A duration in whole seconds parsed from a `<integer><unit>` string.
///
/// Month and year units are calendar approximations (30 and 365 days), the
/// same ones the retention rules are written against.
///
/// # Examples
///
/// ```
/// use mothball_units::TimeSpan;
///
/// let span: TimeSpan = "1H".parse().unwrap();
/// assert_eq!(span.seconds(), 3600);
/// ```
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpan(u64);

impl TimeSpan {
    /// The zero-length span. Configuration uses this for the bare-`0`
    /// "applies from the moment of archival" sentinel, which deliberately
    /// bypasses unit parsing.
    pub const ZERO: Self = Self(0);

    /// The parsed value in seconds.
    pub const fn seconds(&self) -> u64 {
        self.0
    }

    /// Convert to a [`std::time::Duration`] for use with timers.
    pub const fn as_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0)
    }
}

impl From<u64> for TimeSpan {
    fn from(seconds: u64) -> Self {
        Self(seconds)
    }
}

impl FromStr for TimeSpan {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (value, unit) = split_magnitude(s)?;
        let multiplier: u64 = match unit {
            'S' => 1,
            'M' => 60,
            'H' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            'm' => 60 * 60 * 24 * 30,
            'y' => 60 * 60 * 24 * 365,
            _ => exn::bail!(ErrorKind::UnknownUnit(unit)),
        };
        checked(value, multiplier, s).map(Self)
    }
}

/// Split `"123X"` into `(123, 'X')`.
///
/// `u64` parsing rejects empty prefixes, signs, and fractions in one go, so
/// negative magnitudes never reach the unit tables.
fn split_magnitude(s: &str) -> Result<(u64, char)> {
    let trimmed = s.trim();
    let unit = trimmed.chars().last().ok_or_else(|| ErrorKind::InvalidFormat(s.to_string()))?;
    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    let value = digits.parse::<u64>().or_raise(|| ErrorKind::InvalidFormat(s.to_string()))?;
    Ok((value, unit))
}

fn checked(value: u64, multiplier: u64, original: &str) -> Result<u64> {
    value.checked_mul(multiplier).ok_or_else(|| ErrorKind::Overflow(original.to_string()).into())
}
