//! Persisted category ledger keyed by note key.
//!
//! # Responsibility
//! - Load and save the flat `key -> category` JSON mapping.
//! - Enforce set-once semantics for every key.
//!
//! # Invariants
//! - A key, once set, is never overwritten; a second `set` fails without
//!   mutating the stored value.
//! - A missing or blank file loads as an empty manifest.
//! - `save` replaces the file via a sibling temp file and rename, so a
//!   successful save never leaves a truncated manifest behind.
//!
//! # See also
//! - `categorise` (the only mutating caller)

use log::{debug, error, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// Manifest load/save/mutation errors.
#[derive(Debug)]
pub enum ManifestError {
    Io { path: PathBuf, source: io::Error },
    /// Stored bytes are not a JSON object of string values.
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Key already maps to a category.
    DuplicateKey { key: String, existing: String },
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "manifest i/o failed for {}: {source}", path.display())
            }
            Self::Corrupt { path, source } => {
                write!(f, "manifest {} is corrupt: {source}", path.display())
            }
            Self::DuplicateKey { key, existing } => {
                write!(f, "key already exists: {key} (category `{existing}`)")
            }
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Corrupt { source, .. } => Some(source),
            Self::DuplicateKey { .. } => None,
        }
    }
}

/// Set-once mapping from note key to category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a manifest, returning an empty one when the file is absent or blank.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let payload = match std::fs::read(path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=manifest_load module=manifest status=ok entries=0 reason=missing path={}",
                    path.display()
                );
                return Ok(Self::new());
            }
            Err(err) => {
                return Err(ManifestError::Io {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        };

        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        let entries: BTreeMap<String, String> =
            serde_json::from_slice(&payload).map_err(|err| {
                error!(
                    "event=manifest_load module=manifest status=error error_code=corrupt path={}",
                    path.display()
                );
                ManifestError::Corrupt {
                    path: path.to_path_buf(),
                    source: err,
                }
            })?;

        info!(
            "event=manifest_load module=manifest status=ok entries={} path={}",
            entries.len(),
            path.display()
        );
        Ok(Self { entries })
    }

    /// Writes the full mapping, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let path = path.as_ref();
        let io_err = |source: io::Error| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut payload = serde_json::to_vec_pretty(&self.entries).map_err(|err| {
            io_err(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
        })?;
        payload.push(b'\n');

        let tmp_path = temp_sibling(path);
        std::fs::write(&tmp_path, &payload).map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(|err| {
            let _ = std::fs::remove_file(&tmp_path);
            io_err(err)
        })?;

        debug!(
            "event=manifest_save module=manifest status=ok entries={} path={}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Records a category for a key that has never been set.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<(), ManifestError> {
        let key = key.into();
        if let Some(existing) = self.entries.get(&key) {
            return Err(ManifestError::DuplicateKey {
                key,
                existing: existing.clone(),
            });
        }
        self.entries.insert(key, category.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, category)| (key.as_str(), category.as_str()))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
