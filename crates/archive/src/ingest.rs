//! One-shot ingestion: drain eligible files from the source directory into
//! the archive.
//!
//! Runs once at startup, before the retention loop. Each eligible file is
//! registered, materialized into the target store (gzipped or moved as
//! configured), and — unless `keep_in_source` is set — removed from the
//! source. Per-file failures are logged and skipped; a file that could not
//! be archived stays in the source directory, so re-running the pass picks
//! it up again. Files already drained no longer appear in the source
//! listing, which is what makes a re-run a no-op for them.

use crate::error::{ErrorKind, Result};
use crate::naming::{COMPRESSED_SUFFIX, NameTemplate};
use crate::record::FileRecord;
use crate::registry::Registry;
use exn::ResultExt;
use mothball_storage::{SourceEntry, Store};
use regex::Regex;
use tracing::instrument;

/// Which source files are eligible for archival.
#[derive(Clone, Debug)]
pub struct Selection {
    /// Name predicate; `None` matches everything.
    pub matcher: Option<Regex>,
    /// Minimum file size in bytes, inclusive.
    pub min_size: u64,
    /// Maximum file size in bytes, inclusive.
    pub max_size: u64,
}

impl Selection {
    pub fn eligible(&self, entry: &SourceEntry) -> bool {
        let name_matches = self.matcher.as_ref().is_none_or(|regex| regex.is_match(&entry.name));
        name_matches && entry.size >= self.min_size && entry.size <= self.max_size
    }
}

/// Everything the ingestion pass needs besides the two stores.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub selection: Selection,
    pub template: NameTemplate,
    /// Gzip files into the archive instead of moving them verbatim.
    pub compress: bool,
    /// Leave the source copy in place after archiving.
    pub keep_in_source: bool,
}

/// Counters for one ingestion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files present in the source directory.
    pub seen: usize,
    /// Files that passed name and size selection.
    pub selected: usize,
    /// Files successfully materialized and registered.
    pub archived: usize,
    /// Selected files skipped because of an I/O failure.
    pub failed: usize,
}

/// Run the ingestion pass.
///
/// Candidates are processed in discovery order; ids are assigned
/// sequentially and a record is inserted only after its file has been
/// materialized, so a failure leaves no phantom record behind.
#[instrument(skip_all, fields(source = %source.root().display(), target = %target.root().display()))]
pub async fn ingest<R: Registry>(
    source: &Store,
    target: &Store,
    registry: &mut R,
    options: &IngestOptions,
    now: u64,
) -> Result<IngestReport> {
    let entries = source.scan().await.or_raise(|| ErrorKind::Storage)?;
    let mut report = IngestReport { seen: entries.len(), ..IngestReport::default() };
    for entry in entries {
        if !options.selection.eligible(&entry) {
            continue;
        }
        report.selected += 1;
        match ingest_file(source, target, registry.next_id(), options, &entry, now).await {
            Ok(record) => {
                tracing::info!(id = record.id, name = %record.archived_name, "archived file");
                registry.insert(record);
                report.archived += 1;
            },
            // Recovered per file: the candidate stays in the source
            // directory for a later pass.
            Err(error) => {
                tracing::warn!(name = %entry.name, error = ?error, "failed to archive file, skipping");
                report.failed += 1;
            },
        }
    }
    tracing::info!(
        seen = report.seen,
        selected = report.selected,
        archived = report.archived,
        failed = report.failed,
        "ingestion pass complete"
    );
    Ok(report)
}

async fn ingest_file(
    source: &Store,
    target: &Store,
    id: u64,
    options: &IngestOptions,
    entry: &SourceEntry,
    now: u64,
) -> Result<FileRecord> {
    let record = FileRecord::new(id, &entry.name, entry.size, entry.created_at, now);
    let base_name = options.template.render(&record)?;
    let source_path = source.path_of(&entry.name).or_raise(|| ErrorKind::Storage)?;

    let archived_name = if options.compress {
        let compressed = format!("{base_name}{COMPRESSED_SUFFIX}");
        target.compress_in(&source_path, &compressed).await.or_raise(|| ErrorKind::Storage)?;
        if !options.keep_in_source {
            source.remove(&entry.name).await.or_raise(|| ErrorKind::Storage)?;
        }
        compressed
    } else if options.keep_in_source {
        target.copy_in(&source_path, &base_name).await.or_raise(|| ErrorKind::Storage)?;
        base_name
    } else {
        // The move itself vacates the source; nothing left to remove.
        target.rename_in(&source_path, &base_name).await.or_raise(|| ErrorKind::Storage)?;
        base_name
    };

    Ok(record.with_archived_name(archived_name))
}
