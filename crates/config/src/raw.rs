//! The raw configuration document, exactly as written on disk.
//!
//! Field names are camelCase to match the config files operators already
//! have. Values stay as strings here; [`Settings`](crate::Settings) owns
//! the conversion into typed values and all of the validation.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    pub source_folder: String,
    pub target_folder: String,
    pub keep_in_source: bool,
    pub delete_offline_files: String,
    pub missing_file_behaviour: String,
    pub minimum_file_size: String,
    pub maximum_file_size: String,
    /// Regex the file name must match to be archived; empty matches all.
    pub file_name_matches: String,
    pub delay_between_checks: String,
    pub prefix: String,
    pub suffix: String,
    /// Naming pattern directive string.
    pub order: String,
    pub compress_files: bool,
    pub time_blocks: Vec<RawTimeBlock>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTimeBlock {
    pub end_time: RawEndTime,
    pub file_count_division: u64,
}

/// `endTime` is either a duration string or the bare number `0`, the
/// sentinel for "applies from the moment of archival". Bare numbers other
/// than `0` are rejected at validation so a forgotten unit cannot be
/// misread as seconds.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RawEndTime {
    Sentinel(u64),
    Text(String),
}

impl Default for RawSettings {
    /// The document the binary writes when no config file exists yet. The
    /// folders are deliberately blank: validation refuses them, so the
    /// daemon cannot start until the operator fills them in.
    fn default() -> Self {
        Self {
            source_folder: String::new(),
            target_folder: String::new(),
            keep_in_source: false,
            delete_offline_files: "24H".to_string(),
            missing_file_behaviour: "placeholder".to_string(),
            minimum_file_size: "10B".to_string(),
            maximum_file_size: "100M".to_string(),
            file_name_matches: String::new(),
            delay_between_checks: "10S".to_string(),
            prefix: "managed".to_string(),
            suffix: String::new(),
            order: "a_n-d-t".to_string(),
            compress_files: true,
            time_blocks: vec![
                RawTimeBlock { end_time: RawEndTime::Text("6H".to_string()), file_count_division: 1 },
                RawTimeBlock { end_time: RawEndTime::Text("12H".to_string()), file_count_division: 2 },
                RawTimeBlock { end_time: RawEndTime::Text("1d".to_string()), file_count_division: 3 },
                RawTimeBlock { end_time: RawEndTime::Text("1w".to_string()), file_count_division: 4 },
                RawTimeBlock { end_time: RawEndTime::Text("2m".to_string()), file_count_division: 4 },
            ],
        }
    }
}
