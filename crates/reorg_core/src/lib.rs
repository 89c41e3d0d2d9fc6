//! Core domain logic for the note reorganisation pipeline.
//! This crate is the single source of truth for parsing, keying, manifest and
//! bulk-write invariants; the CLI only wires flags onto it.

pub mod categorise;
pub mod config;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod select;
pub mod service;

pub use categorise::{CategoryPrompt, PromptError, PromptState};
pub use config::{
    parse_time_zone, ConfigError, ExecutorConfig, ParserConfig, PipelineConfig, PromptConfig,
};
pub use fs::{FileSystem, OsFileSystem};
pub use logging::{default_log_level, init_logging, LogTarget};
pub use manifest::{Manifest, ManifestError};
pub use model::note::{derive_key, Note};
pub use parse::{NoteParser, ParseError};
pub use pipeline::{
    rollback, ArtifactFormat, FileNoteWriter, LocalObjectStore, LoggingObjectStore, NoteWriter,
    ObjectStore, PipelineError, PipelineExecutor, RunAborted, StoreNoteWriter, WriteError,
};
pub use select::{apply_categories, filter_by_manifest, sort_by_key_descending, SelectError};
pub use service::{NoteService, NoteServiceError, NoteServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
