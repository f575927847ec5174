//! Validated, typed settings.
//!
//! [`Settings`] is the only configuration type the rest of the daemon sees:
//! every magnitude parsed, the regex compiled, the naming template built,
//! and the time-block table constructed — all before anything touches a
//! directory. Validation failures carry the offending camelCase key so the
//! operator can find the line they wrote.

use crate::error::{ErrorKind, Result};
use crate::raw::{RawEndTime, RawSettings};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Format, Json, Toml};
use mothball_archive::{MissingFilePolicy, NameTemplate, TimeBlock, TimeBlockTable};
use mothball_units::{DataSize, TimeSpan};
use regex::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Fully validated daemon configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    pub source_folder: PathBuf,
    pub target_folder: PathBuf,
    pub keep_in_source: bool,
    /// Age past which an offline file's bytes are reclaimed.
    pub delete_offline_after: TimeSpan,
    pub missing_file_behaviour: MissingFilePolicy,
    pub minimum_file_size: DataSize,
    pub maximum_file_size: DataSize,
    /// Compiled selection predicate; `None` matches every file.
    pub file_name_matches: Option<Regex>,
    pub delay_between_checks: TimeSpan,
    /// Compiled naming template (pattern, prefix, and suffix).
    pub template: NameTemplate,
    pub compress_files: bool,
    pub time_blocks: TimeBlockTable,
}

impl Settings {
    /// Load and validate a configuration file. The format follows the file
    /// extension: `.json` or `.toml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Figment::from(Json::file(path)),
            Some("toml") => Figment::from(Toml::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        let raw: RawSettings = figment.extract().or_raise(|| ErrorKind::Malformed)?;
        let settings = Self::try_from(raw)?;
        tracing::info!(config = %path.display(), "settings loaded");
        Ok(settings)
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = crate::error::Error;

    fn try_from(raw: RawSettings) -> Result<Self> {
        if raw.source_folder.is_empty() {
            exn::bail!(invalid("sourceFolder", &raw.source_folder));
        }
        if raw.target_folder.is_empty() {
            exn::bail!(invalid("targetFolder", &raw.target_folder));
        }

        let delete_offline_after = raw
            .delete_offline_files
            .parse::<TimeSpan>()
            .or_raise(|| invalid("deleteOfflineFiles", &raw.delete_offline_files))?;
        let missing_file_behaviour = raw
            .missing_file_behaviour
            .parse::<MissingFilePolicy>()
            .or_raise(|| invalid("missingFileBehaviour", &raw.missing_file_behaviour))?;
        let minimum_file_size = raw
            .minimum_file_size
            .parse::<DataSize>()
            .or_raise(|| invalid("minimumFileSize", &raw.minimum_file_size))?;
        let maximum_file_size = raw
            .maximum_file_size
            .parse::<DataSize>()
            .or_raise(|| invalid("maximumFileSize", &raw.maximum_file_size))?;
        if maximum_file_size < minimum_file_size {
            exn::bail!(invalid("maximumFileSize", &raw.maximum_file_size));
        }

        let file_name_matches = if raw.file_name_matches.is_empty() {
            None
        } else {
            Some(
                Regex::new(&raw.file_name_matches)
                    .or_raise(|| invalid("fileNameMatches", &raw.file_name_matches))?,
            )
        };

        let delay_between_checks = raw
            .delay_between_checks
            .parse::<TimeSpan>()
            .or_raise(|| invalid("delayBetweenChecks", &raw.delay_between_checks))?;
        // A zero delay would spin the retention loop flat out.
        if delay_between_checks.seconds() == 0 {
            exn::bail!(invalid("delayBetweenChecks", &raw.delay_between_checks));
        }

        let template = NameTemplate::new(&raw.order, raw.prefix.clone(), raw.suffix.clone())
            .or_raise(|| invalid("order", &raw.order))?;

        let mut blocks = Vec::with_capacity(raw.time_blocks.len());
        for block in &raw.time_blocks {
            let end = match &block.end_time {
                // The archival-moment sentinel bypasses unit parsing.
                RawEndTime::Sentinel(0) => 0,
                RawEndTime::Sentinel(other) => {
                    exn::bail!(invalid("timeBlocks.endTime", other.to_string()));
                },
                RawEndTime::Text(text) => {
                    text.parse::<TimeSpan>().or_raise(|| invalid("timeBlocks.endTime", text))?.seconds()
                },
            };
            blocks.push(TimeBlock { end, division: block.file_count_division });
        }
        let time_blocks =
            TimeBlockTable::new(blocks).or_raise(|| invalid("timeBlocks", "duplicate or zero-division block"))?;

        Ok(Self {
            source_folder: PathBuf::from(raw.source_folder),
            target_folder: PathBuf::from(raw.target_folder),
            keep_in_source: raw.keep_in_source,
            delete_offline_after,
            missing_file_behaviour,
            minimum_file_size,
            maximum_file_size,
            file_name_matches,
            delay_between_checks,
            template,
            compress_files: raw.compress_files,
            time_blocks,
        })
    }
}

fn invalid(key: &'static str, value: impl Into<String>) -> ErrorKind {
    ErrorKind::InvalidValue { key, value: value.into() }
}

/// Write the default configuration document to `path`, refusing to clobber
/// an existing file. Called by the binary when no config exists yet, so an
/// operator gets a complete document to edit instead of a stack trace.
pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let rendered = serde_json::to_string_pretty(&RawSettings::default()).or_raise(|| ErrorKind::Malformed)?;
    let mut file =
        OpenOptions::new().write(true).create_new(true).open(path).or_raise(|| ErrorKind::Io)?;
    file.write_all(rendered.as_bytes()).or_raise(|| ErrorKind::Io)?;
    file.write_all(b"\n").or_raise(|| ErrorKind::Io)?;
    tracing::warn!(config = %path.display(), "wrote a default config file; fill in the folders before restarting");
    Ok(())
}
