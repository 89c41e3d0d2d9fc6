use std::error::Error;
use std::io;
use std::path::Path;

use log::info;
use reorg_core::fs::ensure_dir;
use reorg_core::{filter_by_manifest, sort_by_key_descending, CategoryPrompt};

use super::{CommandError, Context};

/// Prompts for a category for every note not yet in the manifest, newest first.
pub(crate) fn run_categorise(ctx: &Context, input: &Path) -> Result<(), Box<dyn Error>> {
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

    let mut manifest = service.load_manifest(&cleaned_dir)?;
    let notes = sort_by_key_descending(filter_by_manifest(notes, &manifest, false));

    println!("{} note files to categorise", notes.len());
    ctx.confirm()?;

    let manifest_path = service.manifest_path(&cleaned_dir);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompt = CategoryPrompt::new(stdin.lock(), stdout.lock(), ctx.config.prompt.clone());
    let count = prompt.run(&notes, &mut manifest, &manifest_path)?;
    drop(prompt);

    info!(
        "event=categorise module=cli status=ok notes={} manifest_entries={}",
        count,
        manifest.len()
    );
    println!("finished categorising {count} notes");
    Ok(())
}
