use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use reorg_core::fs::ensure_dir;
use reorg_core::{
    apply_categories, filter_by_manifest, LocalObjectStore, LoggingObjectStore, NoteServiceError,
    NoteWriter, ObjectStore, StoreNoteWriter,
};

use super::{CommandError, Context};
use crate::cli::StoreBackend;

/// Moves every categorised note into the selected storage backend.
pub(crate) async fn run_store(
    ctx: &Context,
    input: &Path,
    backend: StoreBackend,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let cleaned_dir = ctx.absolute(input)?;
    ensure_dir(&cleaned_dir)?;

    let service = ctx.service();
    let notes = service.load_cleaned(&cleaned_dir)?;
    if notes.is_empty() {
        return Err(CommandError::NothingFound {
            path: cleaned_dir,
            what: "json files",
        }
        .into());
    }

    let manifest = service.load_manifest(&cleaned_dir)?;
    if manifest.is_empty() {
        return Err(CommandError::EmptyManifest {
            path: service.manifest_path(&cleaned_dir),
        }
        .into());
    }
    if notes.len() != manifest.len() {
        warn!(
            "event=store_preflight module=cli status=error error_code=length_mismatch notes={} manifest_entries={}",
            notes.len(),
            manifest.len()
        );
        println!(
            "WARNING: mismatched source length: {} notes: {} manifest entries",
            notes.len(),
            manifest.len()
        );
        ctx.confirm()?;
    }

    let notes = apply_categories(filter_by_manifest(notes, &manifest, true), &manifest)?;
    println!("{} notes moving to storage", notes.len());
    ctx.confirm()?;

    let (store, rollback_root): (Arc<dyn ObjectStore>, Option<PathBuf>) = match backend {
        StoreBackend::Log => (Arc::new(LoggingObjectStore), None),
        StoreBackend::Local => {
            let root = ctx.absolute(output.ok_or(CommandError::MissingOutput)?)?;
            // Only a directory created by this run is removed on abort.
            let rollback_root = match service.claim_output(&root) {
                Ok(created) => created.then(|| root.clone()),
                Err(NoteServiceError::OutputNotEmpty { path, entries }) => {
                    warn!(
                        "event=store_preflight module=cli status=error error_code=output_not_empty entries={} dir={}",
                        entries,
                        path.display()
                    );
                    println!(
                        "WARNING: {} already holds {entries} entries; a failed store will leave partial output there",
                        path.display()
                    );
                    ctx.confirm()?;
                    None
                }
                Err(err) => return Err(err.into()),
            };
            (
                Arc::new(LocalObjectStore::new(ctx.fs(), &root)),
                rollback_root,
            )
        }
    };
    let writer: Arc<dyn NoteWriter> = Arc::new(StoreNoteWriter::new(store));
    let count = service
        .write_notes(notes, writer, rollback_root.as_deref())
        .await?;

    info!("event=store module=cli status=ok notes={}", count);
    println!("finished storing {count} notes");
    Ok(())
}
