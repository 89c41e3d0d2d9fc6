//! Fixed-layout extraction parser for raw export documents.
//!
//! # Responsibility
//! - Turn one raw HTML document into a structured `Note`.
//! - Report typed errors for documents that do not follow the layout.
//!
//! # Invariants
//! - Parsing is pure over its input bytes and config.
//! - Only the modified-time line contributes to the timestamp.
//! - Timestamps are interpreted in the configured zone with seconds zeroed.

mod sanitize;

pub use sanitize::sanitize_document;

use crate::config::ParserConfig;
use crate::model::note::Note;
use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Timelike,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Line index of the title.
const TITLE_LINE: usize = 0;
/// Line index of the created-time marker.
const CREATED_LINE: usize = 2;
/// Line index of the modified-time marker.
const MODIFIED_LINE: usize = 3;
/// How far before a skipped wall-clock time to look for the offset in force.
const GAP_LOOKBACK_HOURS: i64 = 24;

/// Extraction failure for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Document has fewer lines than the fixed header needs.
    InsufficientStructure { lines: usize, required: usize },
    /// Created or modified marker missing from its expected line.
    MissingTimestampMarker { line: usize, marker: String },
    /// Modified-time value does not match the configured format or zone.
    TimestampFormatError { value: String, message: String },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientStructure { lines, required } => write!(
                f,
                "not enough lines: found {lines}, need at least {required}"
            ),
            Self::MissingTimestampMarker { line, marker } => {
                write!(f, "cannot locate `{marker}` on line {line}")
            }
            Self::TimestampFormatError { value, message } => {
                write!(f, "cannot parse timestamp `{value}`: {message}")
            }
        }
    }
}

impl Error for ParseError {}

/// Parser bound to one layout configuration.
#[derive(Debug, Clone)]
pub struct NoteParser {
    config: ParserConfig,
}

impl Default for NoteParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl NoteParser {
    /// Raises `min_lines` so every fixed line index and the content start
    /// are in bounds for any document that passes the length check.
    pub fn new(mut config: ParserConfig) -> Self {
        config.min_lines = config
            .min_lines
            .max(MODIFIED_LINE + 1)
            .max(config.content_start_line);
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses raw document bytes into a note without provenance fields.
    pub fn parse(&self, raw: &[u8]) -> Result<Note, ParseError> {
        let decoded = String::from_utf8_lossy(raw);
        let sanitized = sanitize_document(&decoded);
        let lines: Vec<&str> = sanitized
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        if lines.len() < self.config.min_lines {
            return Err(ParseError::InsufficientStructure {
                lines: lines.len(),
                required: self.config.min_lines,
            });
        }

        let title = self.parse_title(lines[TITLE_LINE]);
        let timestamp = self.parse_timestamp(&lines)?;
        let content = self.parse_content(&lines);

        Ok(Note::new(title, timestamp, content))
    }

    fn parse_title(&self, line: &str) -> String {
        let line = line.trim_start();
        let title = line
            .strip_prefix(self.config.title_prefix.as_str())
            .unwrap_or(line);
        title.to_lowercase().trim_matches([' ', '\n']).to_string()
    }

    fn parse_timestamp(&self, lines: &[&str]) -> Result<DateTime<FixedOffset>, ParseError> {
        if !lines[CREATED_LINE].starts_with(self.config.created_marker.as_str()) {
            return Err(ParseError::MissingTimestampMarker {
                line: CREATED_LINE,
                marker: self.config.created_marker.clone(),
            });
        }
        let Some(value) = lines[MODIFIED_LINE].strip_prefix(self.config.modified_marker.as_str())
        else {
            return Err(ParseError::MissingTimestampMarker {
                line: MODIFIED_LINE,
                marker: self.config.modified_marker.clone(),
            });
        };

        let value = value.trim();
        let naive = NaiveDateTime::parse_from_str(value, &self.config.timestamp_format)
            .map_err(|err| ParseError::TimestampFormatError {
                value: value.to_string(),
                message: err.to_string(),
            })?;
        let naive = naive
            .with_second(0)
            .and_then(|value| value.with_nanosecond(0))
            .unwrap_or(naive);

        // Ambiguous wall-clock times (clocks going back) take the earlier
        // instant. Skipped ones (clocks going forward) keep the offset in
        // force before the jump, so 01:30 in a 01:00-02:00 gap reads 02:30.
        let zone = self.config.time_zone;
        let local = match zone.from_local_datetime(&naive) {
            LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => local,
            LocalResult::None => {
                let before = zone
                    .from_local_datetime(&(naive - TimeDelta::hours(GAP_LOOKBACK_HOURS)))
                    .earliest()
                    .ok_or_else(|| ParseError::TimestampFormatError {
                        value: value.to_string(),
                        message: format!("local time does not exist in {}", zone.name()),
                    })?;
                let offset = before.offset().fix().local_minus_utc();
                zone.from_utc_datetime(&(naive - TimeDelta::seconds(i64::from(offset))))
            }
        };
        Ok(local.fixed_offset())
    }

    fn parse_content(&self, lines: &[&str]) -> String {
        let body = &lines[self.config.content_start_line..];
        // The last line is the sentinel produced by the trailing newline.
        let body = match body.split_last() {
            Some((last, rest)) if last.is_empty() => rest,
            _ => body,
        };
        body.join("\n").trim_start_matches([' ', '\n']).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteParser, ParseError};
    use crate::config::ParserConfig;

    const SAMPLE: &str = "Title\nBack\nCreate Time: 01/01/2020 10:00\nModify Time: 02/01/2020 11:30\nBody line 1\nBody line 2";

    #[test]
    fn parses_reference_document() {
        let note = NoteParser::default().parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(note.title, "title");
        assert_eq!(note.timestamp.to_rfc3339(), "2020-01-02T11:30:00+00:00");
        assert_eq!(note.content, "Body line 1\nBody line 2");
    }

    #[test]
    fn strips_navigation_prefix_from_title() {
        let raw = "Back  My Shopping List \nx\nCreate Time: 01/01/2020 10:00\nModify Time: 02/01/2020 11:30\nmilk\neggs";
        let note = NoteParser::default().parse(raw.as_bytes()).unwrap();
        assert_eq!(note.title, "my shopping list");
    }

    #[test]
    fn rejects_short_documents() {
        let err = NoteParser::default()
            .parse(b"Title\nBack\nCreate Time: 01/01/2020 10:00")
            .unwrap_err();
        assert!(matches!(err, ParseError::InsufficientStructure { .. }));
    }

    #[test]
    fn rejects_missing_markers() {
        let raw = "Title\nBack\nCreated: 01/01/2020 10:00\nModify Time: 02/01/2020 11:30\na\nb";
        let err = NoteParser::default().parse(raw.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingTimestampMarker {
                line: 2,
                marker: "Create Time: ".to_string()
            }
        );

        let raw = "Title\nBack\nCreate Time: 01/01/2020 10:00\nModified: 02/01/2020 11:30\na\nb";
        let err = NoteParser::default().parse(raw.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingTimestampMarker { line: 3, .. }
        ));
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let raw = "Title\nBack\nCreate Time: 01/01/2020 10:00\nModify Time: 2020-01-02 11:30\na\nb";
        let err = NoteParser::default().parse(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::TimestampFormatError { .. }));
    }

    #[test]
    fn applies_summer_time_offset() {
        let raw = "Title\nBack\nCreate Time: 01/07/2020 10:00\nModify Time: 02/07/2020 11:30\na\nb";
        let note = NoteParser::default().parse(raw.as_bytes()).unwrap();
        assert_eq!(note.timestamp.to_rfc3339(), "2020-07-02T11:30:00+01:00");
    }

    #[test]
    fn wall_clock_time_skipped_by_dst_moves_forward() {
        let raw = "Title\nBack\nCreate Time: 01/03/2020 10:00\nModify Time: 29/03/2020 01:30\na\nb";
        let note = NoteParser::default().parse(raw.as_bytes()).unwrap();
        assert_eq!(note.timestamp.to_rfc3339(), "2020-03-29T02:30:00+01:00");
        assert_eq!(note.key(), "2020-03-29_title");
    }

    #[test]
    fn ambiguous_wall_clock_time_takes_earlier_instant() {
        let raw = "Title\nBack\nCreate Time: 01/10/2020 10:00\nModify Time: 25/10/2020 01:30\na\nb";
        let note = NoteParser::default().parse(raw.as_bytes()).unwrap();
        assert_eq!(note.timestamp.to_rfc3339(), "2020-10-25T01:30:00+01:00");
    }

    #[test]
    fn low_min_lines_is_raised_to_fixed_header() {
        let parser = NoteParser::new(ParserConfig {
            min_lines: 0,
            content_start_line: 5,
            ..ParserConfig::default()
        });
        assert_eq!(parser.config().min_lines, 5);

        let err = parser.parse(b"Title").unwrap_err();
        assert_eq!(
            err,
            ParseError::InsufficientStructure {
                lines: 2,
                required: 5
            }
        );

        let raw = "Title\nBack\nCreate Time: 01/01/2020 10:00\nModify Time: 02/01/2020 11:30";
        let note = parser.parse(raw.as_bytes()).unwrap();
        assert_eq!(note.content, "");
    }

    #[test]
    fn honours_configured_time_zone() {
        let parser = NoteParser::new(ParserConfig {
            time_zone: chrono_tz::Asia::Tokyo,
            ..ParserConfig::default()
        });
        let note = parser.parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(note.timestamp.to_rfc3339(), "2020-01-02T11:30:00+09:00");
    }

    #[test]
    fn content_left_trims_blank_lines() {
        let raw = "Title\nBack\nCreate Time: 01/01/2020 10:00\nModify Time: 02/01/2020 11:30\n\n  \nfirst\n\nsecond";
        let note = NoteParser::default().parse(raw.as_bytes()).unwrap();
        assert_eq!(note.content, "first\n\nsecond");
    }
}
