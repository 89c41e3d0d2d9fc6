//! Note domain model and key derivation.
//!
//! # Responsibility
//! - Define the structured record extracted from one raw export document.
//! - Derive the stable, human-legible key used by the manifest and as the
//!   base name of every on-disk artifact.
//!
//! # Invariants
//! - `key()` is pure and depends only on `title` and the timestamp's date.
//! - `key()` never exceeds `MAX_KEY_LEN + KEY_TRUNCATION_MARKER.len()` chars.
//! - `category` is never serialized; it only exists between manifest lookup
//!   and output placement.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Cap applied to the `date_title` portion of a key.
pub const MAX_KEY_LEN: usize = 30;
/// Suffix appended when a key was truncated.
pub const KEY_TRUNCATION_MARKER: &str = "__";
/// Date layout used as the key prefix.
pub const KEY_DATE_FORMAT: &str = "%Y-%m-%d";

static PATH_SEPARATORS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[./]").expect("valid path separators regex"));
static JOINING_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ &_=+:]").expect("valid joining chars regex"));
static ILLEGAL_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\-]").expect("valid illegal chars regex"));
static DASH_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid dash run regex"));

/// One exported note.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Opaque source identifier (export subdirectory name).
    pub id: String,
    /// Raw source document the note was extracted from.
    pub original_path: PathBuf,
    /// Lower-cased, trimmed title.
    pub title: String,
    /// Modified time at minute resolution in the reference zone.
    pub timestamp: DateTime<FixedOffset>,
    /// Extracted body text.
    pub content: String,
    /// Operator-assigned category, resolved from the manifest.
    #[serde(skip)]
    pub category: Option<String>,
}

impl Note {
    pub fn new(
        title: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            original_path: PathBuf::new(),
            title: title.into(),
            timestamp,
            content: content.into(),
            category: None,
        }
    }

    /// Attaches provenance fields.
    pub fn with_source(mut self, id: impl Into<String>, original_path: impl Into<PathBuf>) -> Self {
        self.id = id.into();
        self.original_path = original_path.into();
        self
    }

    /// Returns the derived manifest/file key.
    pub fn key(&self) -> String {
        derive_key(&self.title, &self.timestamp)
    }

    /// Returns the timestamp date in `YYYY-MM-DD` form.
    pub fn date_label(&self) -> String {
        self.timestamp.format(KEY_DATE_FORMAT).to_string()
    }
}

/// JSON artifact shape: note fields plus the computed `filename`.
impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Note", 6)?;
        state.serialize_field("filename", &self.key())?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("originalPath", &self.original_path)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("content", &self.content)?;
        state.end()
    }
}

/// Derives `YYYY-MM-DD_<safe title>`, truncated to `MAX_KEY_LEN` plus marker.
pub fn derive_key(title: &str, timestamp: &DateTime<FixedOffset>) -> String {
    let safe_title = sanitize_base_name(&title.to_lowercase());
    let key = format!("{}_{}", timestamp.format(KEY_DATE_FORMAT), safe_title);
    if key.chars().count() > MAX_KEY_LEN {
        let mut truncated: String = key.chars().take(MAX_KEY_LEN).collect();
        truncated.push_str(KEY_TRUNCATION_MARKER);
        return truncated;
    }
    key
}

/// Makes a string safe for use as a file base name.
///
/// `.` and `/` become `-`, accented letters fold to ASCII, joining characters
/// become `-`, anything else outside `[A-Za-z0-9-]` is dropped and dash runs
/// collapse. May return an empty string.
pub fn sanitize_base_name(value: &str) -> String {
    let separated = PATH_SEPARATORS_RE.replace_all(value, "-");
    let folded = fold_accents(separated.trim_matches(' '));
    let joined = JOINING_CHARS_RE.replace_all(&folded, "-");
    let legal = ILLEGAL_CHARS_RE.replace_all(&joined, "");
    DASH_RUN_RE.replace_all(&legal, "-").into_owned()
}

/// Decomposes to NFD and drops combining marks; a few ligatures expand.
fn fold_accents(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for ch in value.nfd().filter(|ch| !is_combining_mark(*ch)) {
        match ch {
            'ß' => folded.push_str("ss"),
            'æ' => folded.push_str("ae"),
            'Æ' => folded.push_str("AE"),
            'œ' => folded.push_str("oe"),
            'Œ' => folded.push_str("OE"),
            'ø' => folded.push('o'),
            'Ø' => folded.push('O'),
            'ł' => folded.push('l'),
            'Ł' => folded.push('L'),
            'đ' => folded.push('d'),
            'Đ' => folded.push('D'),
            other => folded.push(other),
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::{derive_key, sanitize_base_name, Note, KEY_TRUNCATION_MARKER, MAX_KEY_LEN};
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn at(year: i32, month: u32, day: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(year, month, day, 9, 15, 0)
            .unwrap()
    }

    #[test]
    fn key_prefixes_date_and_lowercases_title() {
        assert_eq!(derive_key("Groceries", &at(2021, 5, 1)), "2021-05-01_groceries");
    }

    #[test]
    fn key_replaces_joining_chars_and_drops_unsafe_ones() {
        assert_eq!(
            derive_key("tom & jerry: s01/e02?", &at(2020, 1, 2)),
            "2020-01-02_tom-jerry-s01-e02"
        );
    }

    #[test]
    fn key_folds_accents_and_dots() {
        assert_eq!(derive_key("Café v1.2", &at(2020, 1, 2)), "2020-01-02_cafe-v1-2");
        assert_eq!(sanitize_base_name("straße/øre"), "strasse-ore");
    }

    #[test]
    fn key_is_truncated_with_marker() {
        let key = derive_key("a very long title that keeps going", &at(2019, 12, 31));
        assert_eq!(key, "2019-12-31_a-very-long-title-t__");
        assert_eq!(key.len(), MAX_KEY_LEN + KEY_TRUNCATION_MARKER.len());
    }

    #[test]
    fn key_at_exact_cap_is_not_marked() {
        // 11 chars of date prefix + 19 chars of title = 30.
        let key = derive_key("abcdefghijklmnopqrs", &at(2019, 12, 31));
        assert_eq!(key.len(), MAX_KEY_LEN);
        assert!(!key.ends_with(KEY_TRUNCATION_MARKER));
    }

    #[test]
    fn sanitize_collapses_dashes() {
        assert_eq!(sanitize_base_name("a - b"), "a-b");
        assert_eq!(sanitize_base_name("   "), "");
    }

    #[test]
    fn serialization_adds_filename_and_skips_category() {
        let mut note = Note::new("groceries", at(2021, 5, 1), "milk\neggs")
            .with_source("1234", "/export/1234/content.html");
        note.category = Some("shopping".to_string());

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["filename"], "2021-05-01_groceries");
        assert_eq!(json["id"], "1234");
        assert_eq!(json["originalPath"], "/export/1234/content.html");
        assert_eq!(json["timestamp"], "2021-05-01T09:15:00+01:00");
        assert!(json.get("category").is_none());

        let decoded: Note = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.category, None);
        assert_eq!(decoded.key(), note.key());
    }
}
