use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use reorg_core::{
    ExecutorConfig, FileNoteWriter, LocalObjectStore, Note, NoteService, NoteServiceError,
    NoteWriter, OsFileSystem, PipelineConfig, PipelineError, PipelineExecutor, StoreNoteWriter,
    WriteError,
};

fn notes(count: usize) -> Vec<Note> {
    let ts = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2021, 6, 1, 9, 0, 0)
        .unwrap();
    (0..count)
        .map(|i| {
            Note::new(format!("note {i}"), ts, format!("body {i}")).with_source(format!("id-{i}"), "")
        })
        .collect()
}

/// Writes JSON artifacts but fails for one note id.
struct FailingWriter {
    inner: FileNoteWriter,
    fail_id: &'static str,
    attempts: AtomicUsize,
}

impl NoteWriter for FailingWriter {
    fn write(&self, note: &Note, ordinal: usize) -> Result<(), WriteError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if note.id == self.fail_id {
            return Err(WriteError::Backend {
                object_key: note.key(),
                message: "rejected".to_string(),
            });
        }
        self.inner.write(note, ordinal)
    }
}

struct PanickingWriter;

impl NoteWriter for PanickingWriter {
    fn write(&self, _note: &Note, _ordinal: usize) -> Result<(), WriteError> {
        panic!("writer exploded");
    }
}

fn service(max_in_flight: usize) -> NoteService {
    let mut config = PipelineConfig::default();
    config.executor.max_in_flight = max_in_flight;
    NoteService::new(Arc::new(OsFileSystem), &config)
}

fn categorised(count: usize, category: &str) -> Vec<Note> {
    notes(count)
        .into_iter()
        .map(|mut note| {
            note.category = Some(category.to_string());
            note
        })
        .collect()
}

fn local_store_writer(root: &Path) -> Arc<StoreNoteWriter> {
    let store = LocalObjectStore::new(Arc::new(OsFileSystem), root);
    Arc::new(StoreNoteWriter::new(Arc::new(store)))
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_operations_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");
    let writer = Arc::new(FileNoteWriter::json(Arc::new(OsFileSystem), &root));

    let count = service(50)
        .write_notes(notes(10), writer, Some(root.as_path()))
        .await
        .unwrap();

    assert_eq!(count, 10);
    assert_eq!(count_files(&root), 10);
    assert!(root.join("2021-06-01_note-0.json").exists());
    assert!(root.join("2021-06-01_note-9_9.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_failure_aborts_and_rolls_back_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");
    std::fs::create_dir_all(&root).unwrap();
    let writer = Arc::new(FailingWriter {
        inner: FileNoteWriter::json(Arc::new(OsFileSystem), &root),
        fail_id: "id-3",
        attempts: AtomicUsize::new(0),
    });

    let err = service(2)
        .write_notes(notes(40), writer.clone(), Some(root.as_path()))
        .await
        .expect_err("failing note must abort the run");

    let aborted = match err {
        NoteServiceError::Run(aborted) => aborted,
        other => panic!("unexpected error: {other}"),
    };
    assert!(aborted.completed < 40);
    match &aborted.error {
        PipelineError::Operation { note_id, key, .. } => {
            assert_eq!(note_id, "id-3");
            assert_eq!(key, "2021-06-01_note-3");
        }
        other => panic!("unexpected pipeline error: {other}"),
    }
    assert!(writer.attempts.load(Ordering::SeqCst) < 40);
    assert!(!root.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_operation_is_reported_as_failure() {
    let executor = PipelineExecutor::new(ExecutorConfig::default());
    let aborted = executor
        .run(notes(3), Arc::new(PanickingWriter))
        .await
        .expect_err("panic must abort the run");

    assert_eq!(aborted.completed, 0);
    assert!(matches!(aborted.error, PipelineError::WorkerPanicked { .. }));
}

#[tokio::test]
async fn empty_input_completes_immediately() {
    let executor = PipelineExecutor::new(ExecutorConfig::default());
    let count = executor
        .run(Vec::new(), Arc::new(PanickingWriter))
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_store_leaves_existing_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("precious.txt"), "keep me").unwrap();
    // A plain file where the category directory would go.
    std::fs::write(root.join("work"), "").unwrap();

    let service = service(4);
    let err = service.claim_output(&root).unwrap_err();
    assert!(matches!(
        err,
        NoteServiceError::OutputNotEmpty { entries: 2, .. }
    ));

    let err = service
        .write_notes(categorised(3, "work"), local_store_writer(&root), None)
        .await
        .expect_err("blocked category directory must fail the store");
    assert!(matches!(err, NoteServiceError::Run(_)));
    assert_eq!(
        std::fs::read_to_string(root.join("precious.txt")).unwrap(),
        "keep me"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_store_removes_output_it_created() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");

    let service = service(4);
    assert!(service.claim_output(&root).unwrap());
    assert!(root.is_dir());
    std::fs::write(root.join("work"), "").unwrap();

    let err = service
        .write_notes(
            categorised(3, "work"),
            local_store_writer(&root),
            Some(root.as_path()),
        )
        .await
        .expect_err("blocked category directory must fail the store");
    assert!(matches!(err, NoteServiceError::Run(_)));
    assert!(!root.exists());
}

#[test]
fn empty_existing_output_is_claimed_without_rollback() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!service(1).claim_output(dir.path()).unwrap());
}
