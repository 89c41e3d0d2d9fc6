//! Per-note operations applied by the executor.
//!
//! # Responsibility
//! - Define the `NoteWriter` capability: write or store one note.
//! - Provide JSON-file, text-file and object-store writers.
//!
//! # Invariants
//! - File writers only ever write below their configured root, so the root
//!   can be removed wholesale on rollback.
//! - Ordinal `0` produces the bare key as base name; ordinal `n > 0` appends
//!   `_<n>`.
//! - Writers are stateless across calls and safe to share between tasks.

use crate::fs::FileSystem;
use crate::model::note::Note;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Failure of a single per-note operation.
#[derive(Debug)]
pub enum WriteError {
    Io { path: PathBuf, source: io::Error },
    Encode(serde_json::Error),
    /// Writer requires a category and the note has none.
    MissingCategory,
    /// Object store rejected the write.
    Backend { object_key: String, message: String },
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot write {}: {source}", path.display()),
            Self::Encode(err) => write!(f, "cannot encode note as json: {err}"),
            Self::MissingCategory => write!(f, "note has no category"),
            Self::Backend {
                object_key,
                message,
            } => write!(f, "storage rejected {object_key}: {message}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::MissingCategory | Self::Backend { .. } => None,
        }
    }
}

/// Writes or stores one note.
pub trait NoteWriter: Send + Sync {
    fn write(&self, note: &Note, ordinal: usize) -> Result<(), WriteError>;
}

/// Artifact format for file writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Txt,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Txt => "txt",
        }
    }
}

/// Writes notes as files below a root directory.
///
/// Layout: `<root>/[category]/<key>[_<n>].<ext>`.
pub struct FileNoteWriter {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    format: ArtifactFormat,
}

impl FileNoteWriter {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, format: ArtifactFormat) -> Self {
        Self {
            fs,
            root: root.into(),
            format,
        }
    }

    pub fn json(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self::new(fs, root, ArtifactFormat::Json)
    }

    pub fn txt(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self::new(fs, root, ArtifactFormat::Txt)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the target path for `note` at `ordinal`.
    pub fn artifact_path(&self, note: &Note, ordinal: usize) -> PathBuf {
        let mut dir = self.root.clone();
        if let Some(category) = note.category.as_deref().filter(|value| !value.is_empty()) {
            dir.push(category);
        }
        dir.join(artifact_file_name(&note.key(), ordinal, self.format.extension()))
    }

    fn encode(&self, note: &Note) -> Result<Vec<u8>, WriteError> {
        match self.format {
            ArtifactFormat::Json => {
                let mut payload = serde_json::to_vec(note).map_err(WriteError::Encode)?;
                payload.push(b'\n');
                Ok(payload)
            }
            ArtifactFormat::Txt => Ok(note.content.as_bytes().to_vec()),
        }
    }
}

impl NoteWriter for FileNoteWriter {
    fn write(&self, note: &Note, ordinal: usize) -> Result<(), WriteError> {
        let path = self.artifact_path(note, ordinal);
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|source| WriteError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let payload = self.encode(note)?;
        self.fs
            .write_file(&path, &payload)
            .map_err(|source| WriteError::Io { path, source })
    }
}

/// Builds `<key>[_<ordinal>].<ext>`.
pub fn artifact_file_name(key: &str, ordinal: usize, extension: &str) -> String {
    if ordinal > 0 {
        format!("{key}_{ordinal}.{extension}")
    } else {
        format!("{key}.{extension}")
    }
}

/// Object storage backend.
pub trait ObjectStore: Send + Sync {
    fn put(&self, object_key: &str, body: &[u8]) -> Result<(), String>;
}

/// Object store that writes objects below a local directory.
pub struct LocalObjectStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, object_key: &str, body: &[u8]) -> Result<(), String> {
        let path = self.root.join(object_key);
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|err| format!("cannot create {}: {err}", parent.display()))?;
        }
        self.fs
            .write_file(&path, body)
            .map_err(|err| format!("cannot write {}: {err}", path.display()))
    }
}

/// Dry-run store that only logs what would be uploaded.
#[derive(Debug, Default)]
pub struct LoggingObjectStore;

impl ObjectStore for LoggingObjectStore {
    fn put(&self, object_key: &str, body: &[u8]) -> Result<(), String> {
        info!(
            "event=object_put module=pipeline status=skipped backend=log object_key={} bytes={}",
            object_key,
            body.len()
        );
        Ok(())
    }
}

/// Stores categorized notes in an object store as `<category>/<key>[_n].txt`.
pub struct StoreNoteWriter {
    store: Arc<dyn ObjectStore>,
}

impl StoreNoteWriter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Object key for the note at `ordinal` in the run's input order.
    pub fn object_key(note: &Note, ordinal: usize) -> Result<String, WriteError> {
        let category = note
            .category
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(WriteError::MissingCategory)?;
        Ok(format!(
            "{category}/{}",
            artifact_file_name(&note.key(), ordinal, "txt")
        ))
    }
}

impl NoteWriter for StoreNoteWriter {
    fn write(&self, note: &Note, ordinal: usize) -> Result<(), WriteError> {
        let object_key = Self::object_key(note, ordinal)?;
        self.store
            .put(&object_key, note.content.as_bytes())
            .map_err(|message| WriteError::Backend {
                object_key,
                message,
            })
    }
}
