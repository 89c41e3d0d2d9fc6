//! Bulk per-note operations: executor, writers and rollback.
//!
//! # Responsibility
//! - Run one `NoteWriter` across a note set with bounded concurrency.
//! - Describe run-level failures and undo partial output on abort.
//!
//! # Invariants
//! - A run either completes every note or reports exactly one terminal error.
//! - Rollback removes the whole output root; a rollback failure wraps the
//!   original error instead of replacing it.
//!
//! # See also
//! - `service::note_service` (the orchestration layer that calls `rollback`)

pub mod executor;
pub mod writer;

pub use executor::PipelineExecutor;
pub use writer::{
    artifact_file_name, ArtifactFormat, FileNoteWriter, LocalObjectStore, LoggingObjectStore,
    NoteWriter, ObjectStore, StoreNoteWriter, WriteError,
};

use crate::fs::FileSystem;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// Terminal error of one executor run.
#[derive(Debug)]
pub enum PipelineError {
    /// The per-note operation failed.
    Operation {
        note_id: String,
        key: String,
        source: WriteError,
    },
    /// The task running an operation panicked or was aborted.
    WorkerPanicked { message: String },
    /// The run deadline elapsed before dispatch finished.
    DeadlineExceeded { elapsed_ms: u128 },
    /// Fewer operations finished than were requested without any failure.
    Incomplete {
        completed: usize,
        dispatched: usize,
        total: usize,
    },
    /// Removing partial output failed after `original`.
    Rollback {
        root: PathBuf,
        rollback: io::Error,
        original: Box<PipelineError>,
    },
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation {
                note_id,
                key,
                source,
            } => write!(f, "operation failed for note {note_id} ({key}): {source}"),
            Self::WorkerPanicked { message } => write!(f, "worker panicked: {message}"),
            Self::DeadlineExceeded { elapsed_ms } => {
                write!(f, "deadline exceeded after {elapsed_ms}ms")
            }
            Self::Incomplete {
                completed,
                dispatched,
                total,
            } => write!(
                f,
                "run incomplete: {completed} completed, {dispatched} dispatched, {total} requested"
            ),
            Self::Rollback {
                root,
                rollback,
                original,
            } => write!(
                f,
                "cleanup failed: cannot remove {}: {rollback}: original error: {original}",
                root.display()
            ),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Operation { source, .. } => Some(source),
            Self::Rollback { original, .. } => Some(original.as_ref()),
            Self::WorkerPanicked { .. } | Self::DeadlineExceeded { .. } | Self::Incomplete { .. } => {
                None
            }
        }
    }
}

/// An executor run that stopped before completing every note.
#[derive(Debug)]
pub struct RunAborted {
    /// Operations that finished successfully before the run stopped.
    pub completed: usize,
    pub error: PipelineError,
}

impl Display for RunAborted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run aborted after {} completed operations: {}",
            self.completed, self.error
        )
    }
}

impl Error for RunAborted {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Removes `root` after an aborted run.
///
/// Returns `aborted` unchanged when removal succeeds, otherwise the same
/// completed count with a `Rollback` error wrapping the original.
pub fn rollback(fs: &dyn FileSystem, root: &Path, aborted: RunAborted) -> RunAborted {
    match fs.remove_dir_all(root) {
        Ok(()) => {
            info!(
                "event=pipeline_rollback module=pipeline status=ok root={}",
                root.display()
            );
            aborted
        }
        Err(err) => {
            error!(
                "event=pipeline_rollback module=pipeline status=error root={} error={}",
                root.display(),
                err
            );
            RunAborted {
                completed: aborted.completed,
                error: PipelineError::Rollback {
                    root: root.to_path_buf(),
                    rollback: err,
                    original: Box::new(aborted.error),
                },
            }
        }
    }
}
