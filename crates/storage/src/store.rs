//! Flat directory store.
//!
//! Both directories the daemon touches — the source it drains and the target
//! it archives into — are modeled as a [`Store`]: a single directory
//! addressed by validated flat file names. All I/O goes through `tokio::fs`
//! except gzip compression, which is blocking `flate2` work pushed onto the
//! blocking pool.

use crate::error::{ErrorKind, Result};
use crate::gzip;
use crate::name::validate_name;
use std::fs::create_dir_all as sync_create_dir;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::instrument;

/// A file discovered by [`Store::scan`], carrying the metadata ingestion
/// selection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Plain file name within the scanned directory.
    pub name: String,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Creation time as Unix seconds. Filesystems without birth times fall
    /// back to the modification time, and pre-epoch values clamp to zero.
    pub created_at: u64,
}

/// A single local directory of flat-named files.
///
/// # Examples
///
/// ```no_run
/// use mothball_storage::Store;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = Store::new("/var/lib/mothball/archive")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open a store rooted at `root`, creating the directory if it does not
    /// exist yet. An existing non-directory at that path is rejected.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidRoot(root));
            }
        } else {
            // Non-async on purpose: this runs once at startup and isn't
            // worth the hassle of an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { root })
    }

    /// The directory this store operates on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a validated name inside this store.
    ///
    /// Public so that ingestion can hand a source file's location to the
    /// target store for relocation.
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_name(name)?))
    }

    fn map_io_error(e: io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Names of every regular file directly under the root, sorted.
    ///
    /// Subdirectories are skipped; the store is flat by construction and
    /// anything nested was not put there by this daemon.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| Self::map_io_error(e, &self.root))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
            let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
            if !metadata.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                // The naming engine never produces non-unicode names, so
                // whatever this is, it isn't ours to manage.
                Err(raw) => tracing::warn!(?raw, "skipping non-unicode file name"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Like [`list`](Self::list), but with the size and creation time each
    /// entry had at scan time. Used to enumerate ingestion candidates.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn scan(&self) -> Result<Vec<SourceEntry>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| Self::map_io_error(e, &self.root))?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
            let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
            if !metadata.is_file() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(?raw, "skipping non-unicode file name");
                    continue;
                },
            };
            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or_default();
            found.push(SourceEntry { name, size: metadata.len(), created_at });
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        Ok(fs::try_exists(&path).await.map_err(ErrorKind::Io)?)
    }

    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_of(name)?;
        Ok(fs::write(&path, data).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    /// Create an empty file, failing with [`ErrorKind::AlreadyExists`] if
    /// the name is taken. Used for `.placeholder` markers.
    pub async fn touch(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| Self::map_io_error(e, &path))?;
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        Ok(fs::remove_file(&path).await.map_err(|e| Self::map_io_error(e, &path))?)
    }

    /// Move a file from an arbitrary path into this store under `name`.
    pub async fn rename_in(&self, source: impl AsRef<Path>, name: &str) -> Result<()> {
        let target = self.path_of(name)?;
        Ok(fs::rename(source.as_ref(), &target).await.map_err(|e| Self::map_io_error(e, &target))?)
    }

    /// Copy a file from an arbitrary path into this store under `name`,
    /// leaving the source in place. Returns the bytes copied.
    pub async fn copy_in(&self, source: impl AsRef<Path>, name: &str) -> Result<u64> {
        let target = self.path_of(name)?;
        Ok(fs::copy(source.as_ref(), &target).await.map_err(|e| Self::map_io_error(e, &target))?)
    }

    /// Gzip a file from an arbitrary path into this store under `name`,
    /// leaving the source in place. Returns the uncompressed bytes consumed.
    #[instrument(skip(self, source))]
    pub async fn compress_in(&self, source: impl Into<PathBuf>, name: &str) -> Result<u64> {
        let target = self.path_of(name)?;
        let source = source.into();
        let consumed = tokio::task::spawn_blocking(move || {
            gzip::compress_file(&source, &target).map_err(|e| Self::map_io_error(e, &source))
        })
        .await
        .map_err(|e| ErrorKind::Io(io::Error::other(e)))??;
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_new_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("archive");
        assert!(!root.exists());
        let store = Store::new(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[test]
    fn test_new_rejects_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"occupied").unwrap();
        let err = Store::new(&root).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
    }

    #[test]
    fn test_path_of_validates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        assert!(store.path_of("fine.txt").is_ok());
        assert!(store.path_of("../escape").is_err());
        assert!(store.path_of("").is_err());
    }

    #[tokio::test]
    async fn test_write_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        store.write("b.txt", b"2").await.unwrap();
        store.write("a.txt", b"1").await.unwrap();
        store.write("c.txt", b"3").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        store.write("file.txt", b"data").await.unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["file.txt"]);
    }

    #[tokio::test]
    async fn test_scan_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        store.write("notes.txt", b"hello").await.unwrap();
        let entries = store.scan().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "notes.txt");
        assert_eq!(entries[0].size, 5);
        assert!(entries[0].created_at > 0);
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        assert!(!store.exists("missing.txt").await.unwrap());
        store.write("present.txt", b"data").await.unwrap();
        assert!(store.exists("present.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_is_create_new() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        store.touch("marker.placeholder").await.unwrap();
        assert!(store.exists("marker.placeholder").await.unwrap());
        let err = store.touch("marker.placeholder").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path()).unwrap();
        store.write("doomed.txt", b"data").await.unwrap();
        store.remove("doomed.txt").await.unwrap();
        let err = store.remove("doomed.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_in_moves_source() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let store = Store::new(target_dir.path()).unwrap();
        let source = source_dir.path().join("original.txt");
        std::fs::write(&source, b"payload").unwrap();
        store.rename_in(&source, "renamed.txt").await.unwrap();
        assert!(!source.exists());
        assert_eq!(std::fs::read(target_dir.path().join("renamed.txt")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_copy_in_keeps_source() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let store = Store::new(target_dir.path()).unwrap();
        let source = source_dir.path().join("original.txt");
        std::fs::write(&source, b"payload").unwrap();
        let copied = store.copy_in(&source, "copied.txt").await.unwrap();
        assert_eq!(copied, 7);
        assert!(source.exists());
        assert!(store.exists("copied.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_compress_in_roundtrip() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let store = Store::new(target_dir.path()).unwrap();
        let source = source_dir.path().join("big.log");
        let original = b"line\n".repeat(100);
        std::fs::write(&source, &original).unwrap();

        let consumed = store.compress_in(&source, "big.log.gz").await.unwrap();
        assert_eq!(consumed, original.len() as u64);
        assert!(source.exists());

        let compressed = std::fs::File::open(target_dir.path().join("big.log.gz")).unwrap();
        let mut decoder = GzDecoder::new(compressed);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[tokio::test]
    async fn test_compress_in_missing_source() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let store = Store::new(target_dir.path()).unwrap();
        let err = store.compress_in(source_dir.path().join("gone.log"), "gone.log.gz").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
