use chrono::{DateTime, FixedOffset, TimeZone};
use reorg_core::{
    filter_by_manifest, sort_by_key_descending, Manifest, ManifestError, Note,
};

fn at(year: i32, month: u32, day: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
}

fn notes() -> Vec<Note> {
    vec![
        Note::new("groceries", at(2021, 5, 1), "milk").with_source("a", ""),
        Note::new("ideas", at(2021, 5, 3), "rust").with_source("b", ""),
        Note::new("ideas", at(2021, 5, 3), "more rust").with_source("c", ""),
        Note::new("meeting", at(2020, 12, 24), "agenda").with_source("d", ""),
    ]
}

#[test]
fn groceries_category_survives_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");

    let mut manifest = Manifest::load(&path).unwrap();
    assert!(manifest.is_empty());
    manifest.set("2021-05-01_groceries", "shopping").unwrap();
    manifest.save(&path).unwrap();

    let mut reloaded = Manifest::load(&path).unwrap();
    assert_eq!(reloaded.get("2021-05-01_groceries"), Some("shopping"));
    assert!(reloaded.is_set("2021-05-01_groceries"));

    let err = reloaded
        .set("2021-05-01_groceries", "food")
        .expect_err("keys are set once");
    assert!(matches!(err, ManifestError::DuplicateKey { .. }));
    assert_eq!(reloaded, manifest);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({ "2021-05-01_groceries": "shopping" }));
}

#[test]
fn corrupt_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, b"[\"not\", \"a map\"]").unwrap();

    let err = Manifest::load(&path).unwrap_err();
    assert!(matches!(err, ManifestError::Corrupt { .. }));
}

#[test]
fn manifest_filter_partitions_notes() {
    let mut manifest = Manifest::new();
    manifest.set("2021-05-03_ideas", "work").unwrap();

    let processed = filter_by_manifest(notes(), &manifest, true);
    let unprocessed = filter_by_manifest(notes(), &manifest, false);

    assert_eq!(processed.len() + unprocessed.len(), notes().len());
    let processed_ids: Vec<_> = processed.iter().map(|note| note.id.as_str()).collect();
    let unprocessed_ids: Vec<_> = unprocessed.iter().map(|note| note.id.as_str()).collect();
    assert_eq!(processed_ids, vec!["b", "c"]);
    assert_eq!(unprocessed_ids, vec!["a", "d"]);
}

#[test]
fn sort_is_most_recent_first_stable_and_idempotent() {
    let sorted = sort_by_key_descending(notes());
    let ids: Vec<_> = sorted.iter().map(|note| note.id.clone()).collect();
    assert_eq!(ids, vec!["b", "c", "a", "d"]);

    let resorted = sort_by_key_descending(sorted.clone());
    assert_eq!(resorted, sorted);
}

#[test]
fn empty_inputs_stay_empty() {
    assert!(filter_by_manifest(Vec::new(), &Manifest::new(), true).is_empty());
    assert!(sort_by_key_descending(Vec::new()).is_empty());
}
