//! Note selection and ordering against a manifest snapshot.
//!
//! # Responsibility
//! - Partition a note set into processed/unprocessed by manifest membership.
//! - Order notes most-recent-first for presentation.
//! - Resolve categories from a manifest snapshot before the store phase.
//!
//! # Invariants
//! - For a fixed manifest, `filter_by_manifest(.., true)` and
//!   `filter_by_manifest(.., false)` partition the input exactly.
//! - `sort_by_key_descending` is stable and idempotent.
//! - Nothing here mutates the manifest.

use crate::manifest::Manifest;
use crate::model::note::Note;
use std::cmp::Reverse;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Keeps notes whose key membership in `manifest` equals `keep_if_present`.
pub fn filter_by_manifest(
    notes: Vec<Note>,
    manifest: &Manifest,
    keep_if_present: bool,
) -> Vec<Note> {
    notes
        .into_iter()
        .filter(|note| manifest.is_set(&note.key()) == keep_if_present)
        .collect()
}

/// Stable sort by key, descending. Keys start with an ISO date, so this is
/// most-recent-first.
pub fn sort_by_key_descending(mut notes: Vec<Note>) -> Vec<Note> {
    notes.sort_by_cached_key(|note| Reverse(note.key()));
    notes
}

/// Copies each note's category from the manifest snapshot.
pub fn apply_categories(
    notes: Vec<Note>,
    manifest: &Manifest,
) -> Result<Vec<Note>, SelectError> {
    notes
        .into_iter()
        .map(|mut note| {
            let key = note.key();
            let category = manifest
                .get(&key)
                .ok_or(SelectError::CategoryNotFound(key))?;
            note.category = Some(category.to_string());
            Ok(note)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    CategoryNotFound(String),
}

impl Display for SelectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryNotFound(key) => write!(f, "category not found for note {key}"),
        }
    }
}

impl Error for SelectError {}
