//! Deterministic archive-name generation.
//!
//! Converts a [`FileRecord`] into its on-disk archive name using a
//! user-configured directive pattern. Each character of the pattern is
//! either a directive or a literal:
//!
//! | Directive | Expansion |
//! |---|---|
//! | `a` | record status, upper-cased |
//! | `d` | creation date, `YYYY_MM_DD` |
//! | `t` | creation time, `HH-MM-SS` |
//! | `i` | record id, decimal |
//! | `n` | original name with its final extension stripped |
//! | `p` | configured prefix string |
//! | `s` | configured suffix string |
//! | anything else | copied verbatim |
//!
//! After expansion, the original file's final extension is re-appended with
//! a leading dot (nothing is appended when the original has none).
//!
//! Rendering is pure: the same record and template always produce the same
//! string, which is what lets the retention loop trust a stored name without
//! re-deriving it. Dates and times render in UTC for exactly that reason —
//! a host timezone change must never re-name the archive.
//!
//! # Example
//!
//! ```
//! use mothball_archive::record::FileRecord;
//! use mothball_archive::naming::NameTemplate;
//!
//! // 2024-01-01 12:00:00 UTC
//! let record = FileRecord::new(7, "notes.txt", 5, 1_704_110_400, 1_704_110_400);
//! let template = NameTemplate::new("p_n-d-t", "managed", "").unwrap();
//! assert_eq!(
//!     template.render(&record).unwrap(),
//!     "managed_notes-2024_01_01-12-00-00.txt",
//! );
//! ```

use crate::error::{ErrorKind, Result};
use crate::record::FileRecord;
use exn::ResultExt;
use time::OffsetDateTime;
use time::macros::format_description;

/// Extension appended to archive names when ingestion gzips the file.
pub const COMPRESSED_SUFFIX: &str = ".gz";
/// Extension of the empty marker files the `placeholder` policy creates.
pub const PLACEHOLDER_SUFFIX: &str = ".placeholder";

/// One parsed pattern character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    Status,
    Date,
    Time,
    Id,
    Stem,
    Prefix,
    Suffix,
    Literal(char),
}

/// A compiled naming pattern plus the configured prefix and suffix strings.
///
/// Construction parses the pattern eagerly and rejects anything that could
/// put a path separator into a generated name, so render-time output is
/// always a valid flat file name.
#[derive(Clone, Debug)]
pub struct NameTemplate {
    segments: Vec<Segment>,
    prefix: String,
    suffix: String,
}

impl NameTemplate {
    pub fn new(pattern: &str, prefix: impl Into<String>, suffix: impl Into<String>) -> Result<Self> {
        if pattern.is_empty() {
            exn::bail!(ErrorKind::Pattern("pattern must not be empty".to_string()));
        }
        let prefix = validate_component("prefix", prefix.into())?;
        let suffix = validate_component("suffix", suffix.into())?;
        let segments = pattern
            .chars()
            .map(|c| match c {
                'a' => Ok(Segment::Status),
                'd' => Ok(Segment::Date),
                't' => Ok(Segment::Time),
                'i' => Ok(Segment::Id),
                'n' => Ok(Segment::Stem),
                'p' => Ok(Segment::Prefix),
                's' => Ok(Segment::Suffix),
                '/' | '\\' | '\0' => {
                    Err(ErrorKind::Pattern(format!("pattern contains path separator {c:?}")).into())
                },
                other => Ok(Segment::Literal(other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments, prefix, suffix })
    }

    /// Expand the pattern for `record` and re-append the original file's
    /// extension.
    ///
    /// Referentially transparent: two calls with the same inputs return
    /// identical strings.
    pub fn render(&self, record: &FileRecord) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Status => out.push_str(&record.status.to_string().to_uppercase()),
                Segment::Date => out.push_str(&format_date(record.created_at)?),
                Segment::Time => out.push_str(&format_time(record.created_at)?),
                Segment::Id => out.push_str(&record.id.to_string()),
                Segment::Stem => out.push_str(stem(&record.original_name)),
                Segment::Prefix => out.push_str(&self.prefix),
                Segment::Suffix => out.push_str(&self.suffix),
                Segment::Literal(c) => out.push(*c),
            }
        }
        if let Some(ext) = extension(&record.original_name) {
            out.push('.');
            out.push_str(ext);
        }
        Ok(out)
    }
}

/// Name of the empty marker standing in for a missing archived file: the
/// compression suffix is replaced by [`PLACEHOLDER_SUFFIX`], which is simply
/// appended when the archive copy was not compressed.
///
/// # Examples
///
/// ```
/// use mothball_archive::naming::placeholder_name;
///
/// assert_eq!(placeholder_name("report.txt.gz"), "report.txt.placeholder");
/// assert_eq!(placeholder_name("report.txt"), "report.txt.placeholder");
/// ```
pub fn placeholder_name(archived: &str) -> String {
    match archived.strip_suffix(COMPRESSED_SUFFIX) {
        Some(stripped) => format!("{stripped}{PLACEHOLDER_SUFFIX}"),
        None => format!("{archived}{PLACEHOLDER_SUFFIX}"),
    }
}

fn validate_component(what: &str, value: String) -> Result<String> {
    if value.contains(['/', '\\', '\0']) {
        exn::bail!(ErrorKind::Pattern(format!("{what} contains a path separator: {value:?}")));
    }
    Ok(value)
}

/// `file.tar.gz` → `file.tar`. Names without an extension — including
/// dotfiles like `.bashrc` — are returned whole.
fn stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem,
        _ => name,
    }
}

/// `file.tar.gz` → `gz`; `None` when there is nothing to strip.
fn extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

fn calendar(ts: u64) -> Result<OffsetDateTime> {
    let seconds = i64::try_from(ts).or_raise(|| ErrorKind::Timestamp(ts))?;
    OffsetDateTime::from_unix_timestamp(seconds).or_raise(|| ErrorKind::Timestamp(ts))
}

fn format_date(ts: u64) -> Result<String> {
    let format = format_description!("[year]_[month]_[day]");
    calendar(ts)?.format(&format).or_raise(|| ErrorKind::Timestamp(ts))
}

fn format_time(ts: u64) -> Result<String> {
    let format = format_description!("[hour]-[minute]-[second]");
    calendar(ts)?.format(&format).or_raise(|| ErrorKind::Timestamp(ts))
}
