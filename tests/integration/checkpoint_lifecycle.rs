//! Checkpoint document lifecycle across process boundaries

use coldpack::checkpoint::{CheckpointDocument, CheckpointStore, ConfigSnapshot, Stage};
use coldpack::pipeline::{open_document, ResumeDecision};
use coldpack::JobIdentity;

fn identity() -> JobIdentity {
    JobIdentity::new("s3://src", "data", "s3://dst").unwrap()
}

fn snapshot_of(identity: &JobIdentity) -> ConfigSnapshot {
    ConfigSnapshot {
        source: identity.source().to_string(),
        path: identity.path().to_string(),
        destination: identity.destination().to_string(),
    }
}

#[test]
fn test_progress_survives_save_and_reload() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let identity = identity();

    // "First process": fetch halfway done
    let mut doc = CheckpointDocument::new(identity.token(), snapshot_of(&identity));
    doc.advance_stage();
    doc.discover("fetch/a", 100);
    doc.discover("fetch/b", 200);
    doc.mark_complete("fetch/a", 100);
    doc.mark_failed("fetch/b", "connection reset");
    store.save(&mut doc).unwrap();
    drop(doc);

    // "Second process": same identity resumes with everything intact
    let (resumed, decision) = open_document(&store, &identity, false).unwrap();
    assert_eq!(decision, ResumeDecision::Resumed);
    assert_eq!(resumed.stage(), Stage::Fetching);
    assert!(resumed.is_complete("fetch/a"));
    assert!(!resumed.is_complete("fetch/b"));
    assert_eq!(
        resumed.errors().get("fetch/b").map(String::as_str),
        Some("connection reset")
    );
    assert_eq!(resumed.totals().total_bytes, 300);
    assert_eq!(resumed.totals().completed_bytes, 100);
}

#[test]
fn test_repeated_saves_keep_creation_time() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let identity = identity();

    let mut doc = CheckpointDocument::new(identity.token(), snapshot_of(&identity));
    store.save(&mut doc).unwrap();
    let created = doc.created_at();

    std::thread::sleep(std::time::Duration::from_millis(5));
    doc.discover("fetch/a", 1);
    store.save(&mut doc).unwrap();

    let loaded = store.load(identity.token()).unwrap();
    assert_eq!(loaded.created_at(), created);
    assert!(loaded.updated_at() > created);
}

#[test]
fn test_truncated_file_falls_back_to_fresh_start() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let identity = identity();

    let mut doc = CheckpointDocument::new(identity.token(), snapshot_of(&identity));
    doc.discover("fetch/a", 1);
    store.save(&mut doc).unwrap();

    // Simulate a torn write from a non-atomic editor or disk fault
    let path = store.path_for(identity.token());
    let full = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, &full[..full.len() / 2]).unwrap();

    let (fresh, decision) = open_document(&store, &identity, false).unwrap();
    assert_eq!(decision, ResumeDecision::Fresh);
    assert_eq!(fresh.stage(), Stage::Pending);
    assert!(fresh.items().is_empty());
}

#[test]
fn test_fresh_document_overwrites_corrupt_file_on_save() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());
    let identity = identity();
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(store.path_for(identity.token()), b"][").unwrap();

    let (mut fresh, _) = open_document(&store, &identity, false).unwrap();
    store.save(&mut fresh).unwrap();
    assert!(store.load(identity.token()).is_ok());
}
