//! Note use-case service.
//!
//! # Responsibility
//! - Locate and parse raw export documents into notes.
//! - Reload cleaned JSON artifacts and their manifest.
//! - Write a note set through the bounded executor, rolling back on abort.
//!
//! # Invariants
//! - The first unreadable or unparseable document aborts a batch; the error
//!   names the offending path.
//! - Notes parsed from an export carry the subdirectory name as `id` and the
//!   absolute raw document path as `original_path`.
//! - Artifact scans never include the manifest file.
//! - Callers pass a rollback root only for a directory the run reset or
//!   created; `claim_output` reports which.
//!
//! # See also
//! - `pipeline` (executor, writers, rollback)

use crate::config::PipelineConfig;
use crate::fs::{child_paths, EntryFilter, FileSystem};
use crate::manifest::{Manifest, ManifestError};
use crate::model::note::Note;
use crate::parse::{NoteParser, ParseError};
use crate::pipeline::{rollback, NoteWriter, PipelineExecutor, RunAborted};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Directory listing failed.
    Scan { path: PathBuf, source: io::Error },
    /// Source file could not be read.
    Read { path: PathBuf, source: io::Error },
    /// Raw document does not follow the export layout.
    Parse { path: PathBuf, source: ParseError },
    /// JSON artifact could not be decoded.
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    Manifest(ManifestError),
    /// Output directory could not be prepared.
    Output { path: PathBuf, source: io::Error },
    /// Output directory already holds entries this run does not own.
    OutputNotEmpty { path: PathBuf, entries: usize },
    /// Bulk write stopped before completing every note.
    Run(RunAborted),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan { path, source } => {
                write!(f, "cannot list {}: {source}", path.display())
            }
            Self::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "cannot parse {}: {source}", path.display())
            }
            Self::Decode { path, source } => {
                write!(f, "cannot decode {}: {source}", path.display())
            }
            Self::Manifest(err) => write!(f, "{err}"),
            Self::Output { path, source } => {
                write!(f, "cannot prepare output {}: {source}", path.display())
            }
            Self::OutputNotEmpty { path, entries } => write!(
                f,
                "output {} is not empty: {entries} existing entries",
                path.display()
            ),
            Self::Run(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scan { source, .. } | Self::Read { source, .. } | Self::Output { source, .. } => {
                Some(source)
            }
            Self::Parse { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            Self::Manifest(err) => Some(err),
            Self::OutputNotEmpty { .. } => None,
            Self::Run(err) => Some(err),
        }
    }
}

impl From<ManifestError> for NoteServiceError {
    fn from(value: ManifestError) -> Self {
        Self::Manifest(value)
    }
}

impl From<RunAborted> for NoteServiceError {
    fn from(value: RunAborted) -> Self {
        Self::Run(value)
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Note service facade over a filesystem capability.
pub struct NoteService {
    fs: Arc<dyn FileSystem>,
    parser: NoteParser,
    executor: PipelineExecutor,
    manifest_file_name: String,
    raw_document_name: String,
}

impl NoteService {
    pub fn new(fs: Arc<dyn FileSystem>, config: &PipelineConfig) -> Self {
        Self {
            fs,
            parser: NoteParser::new(config.parser.clone()),
            executor: PipelineExecutor::new(config.executor.clone()),
            manifest_file_name: config.manifest_file_name.clone(),
            raw_document_name: config.raw_document_name.clone(),
        }
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Lists per-note export subdirectories, sorted by path.
    pub fn scan_export(&self, export_dir: &Path) -> NoteServiceResult<Vec<PathBuf>> {
        child_paths(self.fs.as_ref(), export_dir, &[EntryFilter::IsDir]).map_err(|source| {
            NoteServiceError::Scan {
                path: export_dir.to_path_buf(),
                source,
            }
        })
    }

    /// Parses the raw document inside each directory.
    pub fn parse_from_dirs(&self, dirs: &[PathBuf]) -> NoteServiceResult<Vec<Note>> {
        let mut notes = Vec::with_capacity(dirs.len());
        for dir in dirs {
            notes.push(self.parse_dir(dir)?);
        }
        info!(
            "event=notes_parse module=service status=ok notes={}",
            notes.len()
        );
        Ok(notes)
    }

    fn parse_dir(&self, dir: &Path) -> NoteServiceResult<Note> {
        let raw_path = dir.join(&self.raw_document_name);
        let raw_path = self
            .fs
            .absolute(&raw_path)
            .map_err(|source| NoteServiceError::Read {
                path: raw_path.clone(),
                source,
            })?;
        let raw = self
            .fs
            .read_file(&raw_path)
            .map_err(|source| NoteServiceError::Read {
                path: raw_path.clone(),
                source,
            })?;
        let note = self.parser.parse(&raw).map_err(|source| {
            warn!(
                "event=note_parse module=service status=error path={} error={}",
                raw_path.display(),
                source
            );
            NoteServiceError::Parse {
                path: raw_path.clone(),
                source,
            }
        })?;

        let id = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(note.with_source(id, raw_path))
    }

    /// Lists JSON artifacts in a cleaned directory, excluding the manifest.
    pub fn scan_artifacts(&self, cleaned_dir: &Path) -> NoteServiceResult<Vec<PathBuf>> {
        let filters = [
            EntryFilter::IsFile,
            EntryFilter::HasExtension("json".to_string()),
            EntryFilter::NotNamed(vec![self.manifest_file_name.clone()]),
        ];
        child_paths(self.fs.as_ref(), cleaned_dir, &filters).map_err(|source| {
            NoteServiceError::Scan {
                path: cleaned_dir.to_path_buf(),
                source,
            }
        })
    }

    /// Decodes JSON artifacts back into notes.
    pub fn load_artifacts(&self, paths: &[PathBuf]) -> NoteServiceResult<Vec<Note>> {
        let mut notes = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = self
                .fs
                .read_file(path)
                .map_err(|source| NoteServiceError::Read {
                    path: path.clone(),
                    source,
                })?;
            let note: Note =
                serde_json::from_slice(&raw).map_err(|source| NoteServiceError::Decode {
                    path: path.clone(),
                    source,
                })?;
            notes.push(note);
        }
        Ok(notes)
    }

    /// Scans and decodes every artifact in `cleaned_dir`.
    pub fn load_cleaned(&self, cleaned_dir: &Path) -> NoteServiceResult<Vec<Note>> {
        let paths = self.scan_artifacts(cleaned_dir)?;
        let notes = self.load_artifacts(&paths)?;
        info!(
            "event=artifacts_load module=service status=ok notes={} dir={}",
            notes.len(),
            cleaned_dir.display()
        );
        Ok(notes)
    }

    /// Path of the manifest inside `cleaned_dir`.
    pub fn manifest_path(&self, cleaned_dir: &Path) -> PathBuf {
        cleaned_dir.join(&self.manifest_file_name)
    }

    pub fn load_manifest(&self, cleaned_dir: &Path) -> NoteServiceResult<Manifest> {
        Ok(Manifest::load(self.manifest_path(cleaned_dir))?)
    }

    /// Removes and recreates `output_dir`.
    pub fn reset_output(&self, output_dir: &Path) -> NoteServiceResult<()> {
        let output_err = |source| NoteServiceError::Output {
            path: output_dir.to_path_buf(),
            source,
        };
        self.fs.remove_dir_all(output_dir).map_err(output_err)?;
        self.fs.create_dir_all(output_dir).map_err(output_err)?;
        Ok(())
    }

    /// Claims `output_dir` for a run that must not touch existing data.
    ///
    /// Returns `true` when the directory was created here, which makes it
    /// safe to use as a rollback root. An existing empty directory is
    /// accepted and returns `false`. A non-empty one is refused.
    pub fn claim_output(&self, output_dir: &Path) -> NoteServiceResult<bool> {
        let output_err = |source| NoteServiceError::Output {
            path: output_dir.to_path_buf(),
            source,
        };
        match self.fs.read_dir(output_dir) {
            Ok(entries) if entries.is_empty() => Ok(false),
            Ok(entries) => Err(NoteServiceError::OutputNotEmpty {
                path: output_dir.to_path_buf(),
                entries: entries.len(),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.fs.create_dir_all(output_dir).map_err(output_err)?;
                info!(
                    "event=output_claim module=service status=ok created=true dir={}",
                    output_dir.display()
                );
                Ok(true)
            }
            Err(err) => Err(output_err(err)),
        }
    }

    /// Writes `notes` through the executor.
    ///
    /// When the run aborts and `rollback_root` is set, that directory is
    /// removed before the error is returned.
    pub async fn write_notes(
        &self,
        notes: Vec<Note>,
        writer: Arc<dyn NoteWriter>,
        rollback_root: Option<&Path>,
    ) -> NoteServiceResult<usize> {
        match self.executor.run(notes, writer).await {
            Ok(count) => Ok(count),
            Err(aborted) => {
                let aborted = match rollback_root {
                    Some(root) => rollback(self.fs.as_ref(), root, aborted),
                    None => aborted,
                };
                Err(NoteServiceError::Run(aborted))
            }
        }
    }
}
