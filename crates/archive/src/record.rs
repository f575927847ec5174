//! Archived file records and their lifecycle vocabulary.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of an archived file.
///
/// Transitions are monotone: `Online → Offline → Deleted` along the thinning
/// path, `Online → Missing` along the missing-file path. Nothing ever
/// returns to `Online`. The lowercase forms are the wire/display format.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Present in the archive and retained by the current thinning rules.
    #[display("online")]
    Online,
    /// Expected in the archive but absent from the directory listing.
    #[display("missing")]
    Missing,
    /// Thinned out by the sampling rules; bytes may still be on disk until
    /// the reclaim threshold passes.
    #[display("offline")]
    Offline,
    /// Physically removed from the archive. Terminal.
    #[display("deleted")]
    Deleted,
}

/// What the retention loop does when an online file vanishes from the
/// archive directory.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFilePolicy {
    /// Flip the record to [`FileStatus::Missing`] and keep it queryable.
    #[display("mark")]
    Mark,
    /// Evict the record from the registry entirely. This is the one policy
    /// that forgets a file ever existed, distinct from `deleted`.
    #[display("remove")]
    Remove,
    /// Drop an empty `.placeholder` file where the archive copy used to be,
    /// then mark the record missing.
    #[display("placeholder")]
    Placeholder,
}

impl FromStr for MissingFilePolicy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mark" => Ok(Self::Mark),
            "remove" => Ok(Self::Remove),
            "placeholder" => Ok(Self::Placeholder),
            _ => exn::bail!(ErrorKind::Policy(s.to_string())),
        }
    }
}

/// One archived file.
///
/// Everything except `status` is immutable after ingestion; `archived_name`
/// is set exactly once, when the naming engine has produced it, and is the
/// sole key used to find the file on disk afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Sequential, never reused, strictly increasing in ingestion order.
    pub id: u64,
    pub status: FileStatus,
    /// Size in bytes at ingestion time.
    pub file_size: u64,
    /// Source file creation time, Unix seconds.
    pub created_at: u64,
    /// Record creation time, Unix seconds.
    pub archived_at: u64,
    /// Name the file had in the source directory.
    pub original_name: String,
    /// Computed archive name, including the `.gz` suffix when compressed.
    pub archived_name: String,
}

impl FileRecord {
    /// A fresh record for a file about to be archived. Starts `Online` with
    /// an unset archive name; see [`with_archived_name`](Self::with_archived_name).
    pub fn new(id: u64, original_name: impl Into<String>, file_size: u64, created_at: u64, archived_at: u64) -> Self {
        Self {
            id,
            status: FileStatus::Online,
            file_size,
            created_at,
            archived_at,
            original_name: original_name.into(),
            archived_name: String::new(),
        }
    }

    pub fn with_archived_name(mut self, archived_name: impl Into<String>) -> Self {
        self.archived_name = archived_name.into();
        self
    }

    /// Seconds elapsed since the source file was created, clamped at zero
    /// for clocks that have gone backwards.
    pub fn age_at(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }
}
