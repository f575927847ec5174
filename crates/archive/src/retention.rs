//! The retention state machine and its polling loop.
//!
//! Every tick re-lists the archive directory once and walks each tracked
//! record against the same wall-clock instant:
//!
//! - `online`, file absent → apply the configured [`MissingFilePolicy`].
//! - `online`, file present → thin to `offline` when the record's id does
//!   not divide by the cumulative [`TimeBlockTable`] divisor for its age.
//!   Thinning only flips the status; the bytes stay on disk until the
//!   reclaim threshold passes (mark first, delete later).
//! - `offline`, past `delete_offline_after` → remove the file and flip to
//!   `deleted`. A file something else already removed still transitions,
//!   so repeated ticks cannot fail on the same record.
//! - `missing` / `deleted` → terminal, never touched again.
//!
//! Per-record failures are logged and deferred to the next tick; the loop
//! itself only stops when its cancellation token fires, and the token is
//! only observed between ticks, so a tick always runs to completion.

use crate::blocks::TimeBlockTable;
use crate::error::{ErrorKind, Result};
use crate::naming::placeholder_name;
use crate::record::{FileStatus, MissingFilePolicy};
use crate::registry::Registry;
use exn::ResultExt;
use mothball_storage::Store;
use mothball_storage::error::ErrorKind as StorageErrorKind;
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// The rules a tick evaluates every record against.
#[derive(Clone, Debug)]
pub struct RetentionPolicy {
    pub blocks: TimeBlockTable,
    /// Seconds after creation at which an offline file's bytes are
    /// reclaimed (strictly greater-than comparison).
    pub delete_offline_after: u64,
    pub missing: MissingFilePolicy,
}

/// Counters for one tick, for the log line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Records examined this tick.
    pub examined: usize,
    /// Online records flipped to offline by the thinning rules.
    pub thinned: usize,
    /// Records flipped to missing.
    pub marked_missing: usize,
    /// Records evicted by the `remove` missing-file policy.
    pub evicted: usize,
    /// Placeholder marker files created.
    pub placeholders: usize,
    /// Offline files physically deleted.
    pub reclaimed: usize,
    /// Per-record failures deferred to the next tick.
    pub errors: usize,
}

impl TickSummary {
    /// Whether anything actually changed this tick.
    pub fn has_transitions(&self) -> bool {
        self.thinned + self.marked_missing + self.evicted + self.reclaimed + self.errors > 0
    }
}

/// Wall-clock seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Run one retention tick at the given instant.
///
/// Fails as a whole only when the archive directory cannot be listed;
/// everything after that point is recovered per record.
#[instrument(skip_all, fields(now = now))]
pub async fn tick<R: Registry>(
    target: &Store,
    registry: &mut R,
    policy: &RetentionPolicy,
    now: u64,
) -> Result<TickSummary> {
    let listing: HashSet<String> = target.list().await.or_raise(|| ErrorKind::Storage)?.into_iter().collect();
    let mut summary = TickSummary::default();

    for id in registry.ids() {
        let Some(record) = registry.get(id) else { continue };
        summary.examined += 1;
        let status = record.status;
        let name = record.archived_name.clone();
        let age = record.age_at(now);

        match status {
            FileStatus::Online if !listing.contains(&name) => {
                tracing::warn!(id, %name, "archived file is missing");
                apply_missing_policy(target, registry, policy.missing, id, &name, &mut summary).await;
            },
            FileStatus::Online => {
                if !policy.blocks.retains(id, age) {
                    registry.set_status(id, FileStatus::Offline);
                    summary.thinned += 1;
                    tracing::info!(id, %name, "thinned file to offline");
                }
            },
            FileStatus::Offline => {
                if age > policy.delete_offline_after {
                    reclaim(target, registry, id, &name, &mut summary).await;
                }
            },
            // Terminal for this loop.
            FileStatus::Missing | FileStatus::Deleted => {},
        }
    }

    Ok(summary)
}

async fn apply_missing_policy<R: Registry>(
    target: &Store,
    registry: &mut R,
    policy: MissingFilePolicy,
    id: u64,
    name: &str,
    summary: &mut TickSummary,
) {
    match policy {
        MissingFilePolicy::Mark => {
            registry.set_status(id, FileStatus::Missing);
            summary.marked_missing += 1;
        },
        MissingFilePolicy::Remove => {
            registry.evict(id);
            summary.evicted += 1;
            tracing::warn!(id, %name, "purged missing file from the registry");
        },
        MissingFilePolicy::Placeholder => {
            let marker = placeholder_name(name);
            match target.touch(&marker).await {
                Ok(()) => summary.placeholders += 1,
                // A marker from an earlier run already stands in.
                Err(error) if matches!(&*error, StorageErrorKind::AlreadyExists(_)) => {},
                Err(error) => {
                    // Leave the record online so the placeholder attempt
                    // repeats next tick.
                    tracing::warn!(id, %marker, error = ?error, "failed to create placeholder");
                    summary.errors += 1;
                    return;
                },
            }
            registry.set_status(id, FileStatus::Missing);
            summary.marked_missing += 1;
        },
    }
}

async fn reclaim<R: Registry>(
    target: &Store,
    registry: &mut R,
    id: u64,
    name: &str,
    summary: &mut TickSummary,
) {
    match target.remove(name).await {
        Ok(()) => {
            registry.set_status(id, FileStatus::Deleted);
            summary.reclaimed += 1;
            tracing::info!(id, %name, "deleted offline file");
        },
        // Someone beat us to it; the outcome is what matters.
        Err(error) if matches!(&*error, StorageErrorKind::NotFound(_)) => {
            registry.set_status(id, FileStatus::Deleted);
        },
        Err(error) => {
            tracing::warn!(id, %name, error = ?error, "failed to delete offline file, will retry");
            summary.errors += 1;
        },
    }
}

/// Poll forever: one [`tick`] per interval until `shutdown` fires.
///
/// The token is only checked at the sleep boundary, so an in-flight tick
/// always completes before the loop exits. The first tick fires
/// immediately, evaluating the freshly-ingested records before the first
/// sleep.
pub async fn run<R: Registry>(
    target: &Store,
    registry: &mut R,
    policy: &RetentionPolicy,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut timer = tokio::time::interval(every);
    // A slow tick should push the next one back, not cause a burst.
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = every.as_secs(), "retention loop started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("retention loop stopping");
                break;
            },
            _ = timer.tick() => {
                match tick(target, registry, policy, unix_now()).await {
                    Ok(summary) if summary.has_transitions() => {
                        tracing::info!(
                            examined = summary.examined,
                            thinned = summary.thinned,
                            marked_missing = summary.marked_missing,
                            evicted = summary.evicted,
                            placeholders = summary.placeholders,
                            reclaimed = summary.reclaimed,
                            errors = summary.errors,
                            "retention tick complete"
                        );
                    },
                    Ok(summary) => tracing::debug!(examined = summary.examined, "retention tick complete"),
                    Err(error) => tracing::warn!(error = ?error, "retention tick failed, will retry"),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::TimeBlock;
    use crate::record::FileRecord;
    use crate::registry::MemoryRegistry;

    const CREATED: u64 = 1_000_000;

    fn policy(pairs: &[(u64, u64)], missing: MissingFilePolicy) -> RetentionPolicy {
        RetentionPolicy {
            blocks: TimeBlockTable::new(pairs.iter().map(|&(end, division)| TimeBlock { end, division }))
                .unwrap(),
            delete_offline_after: 86_400,
            missing,
        }
    }

    async fn store_with(files: &[&str]) -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        for file in files {
            store.write(file, b"data").await.unwrap();
        }
        (dir, store)
    }

    fn tracked(id: u64, name: &str, status: FileStatus) -> FileRecord {
        let mut record = FileRecord::new(id, "orig.txt", 4, CREATED, CREATED).with_archived_name(name);
        record.status = status;
        record
    }

    #[tokio::test]
    async fn test_fresh_record_stays_online() {
        let (_dir, store) = store_with(&["a.txt.gz"]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(3, "a.txt.gz", FileStatus::Online));

        // Age zero, all thresholds unreached: total division is 1.
        let policy = policy(&[(3600, 2), (86_400, 5)], MissingFilePolicy::Mark);
        let summary = tick(&store, &mut registry, &policy, CREATED).await.unwrap();
        assert_eq!(summary.thinned, 0);
        assert_eq!(registry.get(3).unwrap().status, FileStatus::Online);
    }

    #[tokio::test]
    async fn test_thinning_flips_to_offline_but_keeps_bytes() {
        let (dir, store) = store_with(&["a.txt.gz"]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(3, "a.txt.gz", FileStatus::Online));

        // Past the 1-hour threshold with division 2: id 3 is thinned.
        let policy = policy(&[(3600, 2)], MissingFilePolicy::Mark);
        let summary = tick(&store, &mut registry, &policy, CREATED + 7200).await.unwrap();
        assert_eq!(summary.thinned, 1);
        assert_eq!(registry.get(3).unwrap().status, FileStatus::Offline);
        // Two-phase: marking does not touch the file.
        assert!(dir.path().join("a.txt.gz").exists());
    }

    #[tokio::test]
    async fn test_divisible_id_survives_thinning() {
        let (_dir, store) = store_with(&["a.txt.gz"]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(4, "a.txt.gz", FileStatus::Online));

        let policy = policy(&[(3600, 2)], MissingFilePolicy::Mark);
        tick(&store, &mut registry, &policy, CREATED + 7200).await.unwrap();
        assert_eq!(registry.get(4).unwrap().status, FileStatus::Online);
    }

    #[tokio::test]
    async fn test_missing_policy_mark() {
        let (_dir, store) = store_with(&[]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(1, "gone.txt.gz", FileStatus::Online));

        let policy = policy(&[], MissingFilePolicy::Mark);
        let summary = tick(&store, &mut registry, &policy, CREATED).await.unwrap();
        assert_eq!(summary.marked_missing, 1);
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Missing);
    }

    #[tokio::test]
    async fn test_missing_policy_remove_evicts() {
        let (_dir, store) = store_with(&[]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(1, "gone.txt.gz", FileStatus::Online));

        let policy = policy(&[], MissingFilePolicy::Remove);
        let summary = tick(&store, &mut registry, &policy, CREATED).await.unwrap();
        assert_eq!(summary.evicted, 1);
        // Evicted, not marked deleted: the record is gone entirely.
        assert!(registry.get(1).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_missing_policy_placeholder() {
        let (dir, store) = store_with(&[]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(1, "gone.txt.gz", FileStatus::Online));

        let policy = policy(&[], MissingFilePolicy::Placeholder);
        let summary = tick(&store, &mut registry, &policy, CREATED).await.unwrap();
        assert_eq!(summary.placeholders, 1);
        assert_eq!(summary.marked_missing, 1);
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Missing);
        let marker = dir.path().join("gone.txt.placeholder");
        assert!(marker.exists());
        assert_eq!(std::fs::metadata(&marker).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_already_present_is_fine() {
        let (_dir, store) = store_with(&["gone.txt.placeholder"]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(1, "gone.txt.gz", FileStatus::Online));

        let policy = policy(&[], MissingFilePolicy::Placeholder);
        let summary = tick(&store, &mut registry, &policy, CREATED).await.unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Missing);
    }

    #[tokio::test]
    async fn test_offline_deleted_after_threshold() {
        let (dir, store) = store_with(&["old.txt.gz"]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(1, "old.txt.gz", FileStatus::Offline));

        let policy = policy(&[], MissingFilePolicy::Mark);
        // Exactly at the threshold: strictly-greater comparison, no delete.
        let summary = tick(&store, &mut registry, &policy, CREATED + 86_400).await.unwrap();
        assert_eq!(summary.reclaimed, 0);
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Offline);

        // One second past: deleted.
        let summary = tick(&store, &mut registry, &policy, CREATED + 86_401).await.unwrap();
        assert_eq!(summary.reclaimed, 1);
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Deleted);
        assert!(!dir.path().join("old.txt.gz").exists());
    }

    #[tokio::test]
    async fn test_offline_deletion_is_idempotent() {
        let (_dir, store) = store_with(&[]).await;
        let mut registry = MemoryRegistry::new();
        // The file is already gone before we ever try to delete it.
        registry.insert(tracked(1, "old.txt.gz", FileStatus::Offline));

        let policy = policy(&[], MissingFilePolicy::Mark);
        let summary = tick(&store, &mut registry, &policy, CREATED + 100_000).await.unwrap();
        assert_eq!(summary.errors, 0);
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Deleted);

        // And a repeat tick over the deleted record is a no-op.
        let summary = tick(&store, &mut registry, &policy, CREATED + 200_000).await.unwrap();
        assert!(!summary.has_transitions());
    }

    #[tokio::test]
    async fn test_terminal_states_untouched() {
        let (_dir, store) = store_with(&[]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(1, "a.txt.gz", FileStatus::Missing));
        registry.insert(tracked(2, "b.txt.gz", FileStatus::Deleted));

        let policy = policy(&[(0, 7)], MissingFilePolicy::Remove);
        let summary = tick(&store, &mut registry, &policy, CREATED + 1_000_000).await.unwrap();
        assert_eq!(summary.examined, 2);
        assert!(!summary.has_transitions());
        assert_eq!(registry.get(1).unwrap().status, FileStatus::Missing);
        assert_eq!(registry.get(2).unwrap().status, FileStatus::Deleted);
    }

    // Ingest-evaluate-thin-delete across a whole lifecycle.
    #[tokio::test]
    async fn test_lifecycle_progression() {
        let (dir, store) = store_with(&["a.txt.gz"]).await;
        let mut registry = MemoryRegistry::new();
        registry.insert(tracked(5, "a.txt.gz", FileStatus::Online));
        let policy = policy(&[(3600, 2)], MissingFilePolicy::Mark);

        // Young: stays online.
        tick(&store, &mut registry, &policy, CREATED + 60).await.unwrap();
        assert_eq!(registry.get(5).unwrap().status, FileStatus::Online);

        // Crosses the thinning threshold: marked offline, bytes intact.
        tick(&store, &mut registry, &policy, CREATED + 4000).await.unwrap();
        assert_eq!(registry.get(5).unwrap().status, FileStatus::Offline);
        assert!(dir.path().join("a.txt.gz").exists());

        // Crosses the reclaim threshold: deleted for real.
        tick(&store, &mut registry, &policy, CREATED + 90_000).await.unwrap();
        assert_eq!(registry.get(5).unwrap().status, FileStatus::Deleted);
        assert!(!dir.path().join("a.txt.gz").exists());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let (_dir, store) = store_with(&[]).await;
        let mut registry = MemoryRegistry::new();
        let policy = policy(&[], MissingFilePolicy::Mark);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        // Already-cancelled token: the loop must return promptly.
        run(&store, &mut registry, &policy, Duration::from_secs(3600), shutdown).await;
    }
}
