//! Filesystem capability consumed by the pipeline.
//!
//! # Responsibility
//! - Define the narrow set of filesystem operations the pipeline needs.
//! - Provide the local OS implementation and child-path scanning helpers.
//!
//! # Invariants
//! - Directory listings returned by `child_paths` are sorted by path.
//! - `remove_dir_all` treats an already-absent path as success.
//! - `create_dir_all` is safe to call concurrently for the same path.

use std::io;
use std::path::{Path, PathBuf};

/// Kind of one directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One directory entry with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Filesystem operations required by the pipeline.
pub trait FileSystem: Send + Sync {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn absolute(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Local OS filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        std::fs::write(path, data)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                kind,
            });
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn absolute(&self, path: &Path) -> io::Result<PathBuf> {
        std::path::absolute(path)
    }
}

/// Predicate applied to directory entries while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryFilter {
    IsDir,
    IsFile,
    /// Extension without the leading dot, compared case-insensitively.
    HasExtension(String),
    NotNamed(Vec<String>),
}

impl EntryFilter {
    pub fn accepts(&self, entry: &DirEntryInfo) -> bool {
        match self {
            Self::IsDir => entry.kind == EntryKind::Dir,
            Self::IsFile => entry.kind == EntryKind::File,
            Self::HasExtension(ext) => entry
                .path
                .extension()
                .and_then(|value| value.to_str())
                .is_some_and(|value| value.eq_ignore_ascii_case(ext)),
            Self::NotNamed(names) => !names.iter().any(|name| name == &entry.name),
        }
    }
}

/// Returns child paths of `parent` accepted by every filter, sorted by path.
pub fn child_paths(
    fs: &dyn FileSystem,
    parent: &Path,
    filters: &[EntryFilter],
) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs
        .read_dir(parent)?
        .into_iter()
        .filter(|entry| filters.iter().all(|filter| filter.accepts(entry)))
        .map(|entry| entry.path)
        .collect();
    paths.sort();
    Ok(paths)
}

/// Fails unless `path` exists and is a directory.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    let metadata = std::fs::metadata(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("path does not exist: {}", path.display()),
            )
        } else {
            err
        }
    })?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path is not a directory: {}", path.display()),
        ));
    }
    Ok(())
}
