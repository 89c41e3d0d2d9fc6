use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use log::info;
use reorg_core::fs::ensure_dir;
use reorg_core::{ArtifactFormat, FileNoteWriter, NoteWriter};

use super::{CommandError, Context};
use crate::cli::OutputFormat;

/// Parses every export directory and rewrites `output` with one artifact per note.
pub(crate) async fn run_clean(
    ctx: &Context,
    input: &Path,
    output: &Path,
    format: OutputFormat,
    subdir: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let mut export_dir = ctx.absolute(input)?;
    if let Some(subdir) = subdir {
        export_dir.push(subdir);
    }
    let output_dir = ctx.absolute(output)?;
    ensure_dir(&export_dir)?;

    let service = ctx.service();
    info!(
        "event=clean_scan module=cli status=start dir={}",
        export_dir.display()
    );
    let dirs = service.scan_export(&export_dir)?;
    if dirs.is_empty() {
        return Err(CommandError::NothingFound {
            path: export_dir,
            what: "directories",
        }
        .into());
    }

    println!("{} directories to search for note files", dirs.len());
    ctx.confirm()?;

    let notes = service.parse_from_dirs(&dirs)?;
    println!(
        "parsed {} notes; writing to {} will reset its existing contents",
        notes.len(),
        output_dir.display()
    );
    ctx.confirm()?;

    service.reset_output(&output_dir)?;
    let format = match format {
        OutputFormat::Json => ArtifactFormat::Json,
        OutputFormat::Txt => ArtifactFormat::Txt,
    };
    let writer: Arc<dyn NoteWriter> = Arc::new(FileNoteWriter::new(ctx.fs(), &output_dir, format));
    let count = service
        .write_notes(notes, writer, Some(output_dir.as_path()))
        .await?;

    info!(
        "event=clean module=cli status=ok notes={} output={}",
        count,
        output_dir.display()
    );
    println!("finished writing {count} notes");
    Ok(())
}
