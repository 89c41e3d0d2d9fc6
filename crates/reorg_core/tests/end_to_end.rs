use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use reorg_core::{
    apply_categories, filter_by_manifest, sort_by_key_descending, CategoryPrompt, FileNoteWriter,
    LocalObjectStore, Manifest, NoteService, OsFileSystem, PipelineConfig, StoreNoteWriter,
};

fn write_raw(export: &Path, id: &str, title: &str, modified: &str, body: &[&str]) {
    let dir = export.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    let raw = format!(
        "<html><body><div>Back {title}</div><br><div>Back</div><br>\
         <div>Create Time: 01/01/2021 00:00</div><br>\
         <div>Modify Time: {modified}</div><br>{}</body></html>",
        body.iter()
            .map(|line| format!("<div>{line}</div>"))
            .collect::<Vec<_>>()
            .join("<br>")
    );
    std::fs::write(dir.join("content.html"), raw).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clean_categorise_and_store_round_trip() {
    let workspace = tempfile::tempdir().unwrap();
    let export = workspace.path().join("export").join("Other");
    let cleaned = workspace.path().join("cleaned");
    let stored = workspace.path().join("stored");

    write_raw(&export, "100", "Groceries", "01/05/2021 09:30", &["milk &amp; eggs", "bread"]);
    write_raw(&export, "200", "Meeting Notes", "03/05/2021 14:00", &["agenda", "actions"]);
    write_raw(
        &export,
        "300",
        "Ideas",
        "02/05/2021 18:15",
        &["one", "two", "three", "four", "five", "six"],
    );

    let fs = Arc::new(OsFileSystem);
    let service = NoteService::new(fs.clone(), &PipelineConfig::default());

    // clean
    let dirs = service.scan_export(&export).unwrap();
    let parsed = service.parse_from_dirs(&dirs).unwrap();
    assert_eq!(parsed.len(), 3);
    service.reset_output(&cleaned).unwrap();
    let writer = Arc::new(FileNoteWriter::json(fs.clone(), &cleaned));
    let written = service
        .write_notes(parsed.clone(), writer, Some(cleaned.as_path()))
        .await
        .unwrap();
    assert_eq!(written, 3);

    // reload
    let reloaded = sort_by_key_descending(service.load_cleaned(&cleaned).unwrap());
    let keys: Vec<_> = reloaded.iter().map(|note| note.key()).collect();
    assert_eq!(
        keys,
        vec![
            "2021-05-03_meeting-notes",
            "2021-05-02_ideas",
            "2021-05-01_groceries"
        ]
    );
    let groceries = reloaded
        .iter()
        .find(|note| note.id == "100")
        .expect("groceries note reloaded");
    let original = parsed.iter().find(|note| note.id == "100").unwrap();
    assert_eq!(groceries, original);
    assert_eq!(groceries.content, "milk & eggs\nbread");

    // categorise
    let mut manifest = service.load_manifest(&cleaned).unwrap();
    let pending = sort_by_key_descending(filter_by_manifest(reloaded, &manifest, false));
    let manifest_path = service.manifest_path(&cleaned);
    let mut prompt = CategoryPrompt::new(
        Cursor::new(b"work\nf\n\nshopping\n".to_vec()),
        Vec::new(),
        PipelineConfig::default().prompt,
    );
    let categorised = prompt.run(&pending, &mut manifest, &manifest_path).unwrap();
    assert_eq!(categorised, 3);

    let persisted = Manifest::load(&manifest_path).unwrap();
    assert_eq!(persisted.get("2021-05-03_meeting-notes"), Some("work"));
    assert_eq!(persisted.get("2021-05-02_ideas"), Some("_none"));
    assert_eq!(persisted.get("2021-05-01_groceries"), Some("shopping"));

    // a second session has nothing left to prompt for
    let remaining = filter_by_manifest(service.load_cleaned(&cleaned).unwrap(), &persisted, false);
    assert!(remaining.is_empty());

    // store
    let notes = service.load_cleaned(&cleaned).unwrap();
    let notes = apply_categories(filter_by_manifest(notes, &persisted, true), &persisted).unwrap();
    assert!(service.claim_output(&stored).unwrap());
    let store = Arc::new(LocalObjectStore::new(fs.clone(), &stored));
    let moved = service
        .write_notes(notes, Arc::new(StoreNoteWriter::new(store)), Some(stored.as_path()))
        .await
        .unwrap();
    assert_eq!(moved, 3);

    // Ordinals follow the sorted artifact file names.
    assert_eq!(
        std::fs::read_to_string(stored.join("shopping/2021-05-01_groceries.txt")).unwrap(),
        "milk & eggs\nbread"
    );
    assert_eq!(
        std::fs::read_to_string(stored.join("_none/2021-05-02_ideas_1.txt")).unwrap(),
        "one\ntwo\nthree\nfour\nfive\nsix"
    );
    assert!(stored.join("work/2021-05-03_meeting-notes_2.txt").exists());
}
