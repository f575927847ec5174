//! Gzip materialization for ingested files.
//!
//! The archive's on-disk compression format is gzip, full stop; files are
//! compressed exactly once on their way into the archive and never read back
//! by the daemon. Compression always uses the highest level, prioritizing
//! storage space over ingestion speed.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

const GZIP_LEVEL: Compression = Compression::best();

/// Stream-compress `source` into `target`, returning the number of
/// uncompressed bytes consumed.
pub(crate) fn compress_file(source: &Path, target: &Path) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut encoder = GzEncoder::new(File::create(target)?, GZIP_LEVEL);
    let consumed = io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;
    Ok(consumed)
}
