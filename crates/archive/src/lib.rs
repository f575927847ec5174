pub mod blocks;
pub mod error;
pub mod ingest;
pub mod naming;
pub mod record;
pub mod registry;
pub mod retention;

pub use crate::blocks::{TimeBlock, TimeBlockTable};
pub use crate::ingest::{IngestOptions, IngestReport, Selection, ingest};
pub use crate::naming::{COMPRESSED_SUFFIX, NameTemplate, PLACEHOLDER_SUFFIX, placeholder_name};
pub use crate::record::{FileRecord, FileStatus, MissingFilePolicy};
pub use crate::registry::{MemoryRegistry, Registry};
pub use crate::retention::{RetentionPolicy, TickSummary, run, tick, unix_now};
