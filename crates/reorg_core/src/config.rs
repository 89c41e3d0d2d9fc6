//! Pipeline configuration values.
//!
//! # Responsibility
//! - Collect the fixed layout constants of the export format in one place.
//! - Hand explicit config values to the parser, executor and prompt loop at
//!   construction instead of reading module-level globals.
//!
//! # Invariants
//! - `Default` values reproduce the export format observed in the wild
//!   (`Back` navigation label, `Create Time: `/`Modify Time: ` markers,
//!   `DD/MM/YYYY HH:MM`, `Europe/London`).
//! - `ExecutorConfig::max_in_flight` is never zero after normalization.

use chrono_tz::Tz;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

/// Reference time zone used when none is configured.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Europe::London;
/// Default admission ceiling for bulk operations.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;
/// File name reserved for the manifest inside a cleaned directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
/// File name of the raw document inside each export subdirectory.
pub const RAW_DOCUMENT_NAME: &str = "content.html";

/// Layout constants for the extraction parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Navigation label that may precede the title on line 0.
    pub title_prefix: String,
    /// Marker expected at the start of line 2.
    pub created_marker: String,
    /// Marker expected at the start of line 3.
    pub modified_marker: String,
    /// `chrono` format string for the modified-time value.
    pub timestamp_format: String,
    /// Line index where note content starts.
    pub content_start_line: usize,
    /// Minimum number of lines (including the trailing sentinel line).
    pub min_lines: usize,
    /// Zone used to interpret wall-clock timestamps.
    pub time_zone: Tz,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            title_prefix: "Back".to_string(),
            created_marker: "Create Time: ".to_string(),
            modified_marker: "Modify Time: ".to_string(),
            timestamp_format: "%d/%m/%Y %H:%M".to_string(),
            content_start_line: 4,
            min_lines: 6,
            time_zone: DEFAULT_TIME_ZONE,
        }
    }
}

/// Settings for the bounded concurrent executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum number of operations in flight at once.
    pub max_in_flight: usize,
    /// Optional dispatch deadline measured from the start of a run.
    pub deadline: Option<Duration>,
}

impl ExecutorConfig {
    /// Returns the admission ceiling, treating `0` as `1`.
    pub fn normalized_max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            deadline: None,
        }
    }
}

/// Settings for the interactive category prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// Number of content lines rendered before the operator asks for more.
    pub abridged_lines: usize,
    /// Category stored when the operator submits an empty response.
    pub default_category: String,
    /// Reserved response that switches to full rendering.
    pub show_full_token: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            abridged_lines: 5,
            default_category: "_none".to_string(),
            show_full_token: "f".to_string(),
        }
    }
}

/// Aggregate configuration for one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub parser: ParserConfig,
    pub executor: ExecutorConfig,
    pub prompt: PromptConfig,
    pub manifest_file_name: String,
    pub raw_document_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            executor: ExecutorConfig::default(),
            prompt: PromptConfig::default(),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
            raw_document_name: RAW_DOCUMENT_NAME.to_string(),
        }
    }
}

/// Parses an IANA zone name such as `Europe/London`.
pub fn parse_time_zone(value: &str) -> Result<Tz, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyTimeZone);
    }
    Tz::from_str(trimmed).map_err(|_| ConfigError::UnknownTimeZone(trimmed.to_string()))
}

/// Configuration parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyTimeZone,
    UnknownTimeZone(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTimeZone => write!(f, "time zone must not be empty"),
            Self::UnknownTimeZone(value) => write!(f, "unknown time zone: {value}"),
        }
    }
}

impl Error for ConfigError {}
