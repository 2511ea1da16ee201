//! Job identity tokens as checkpoint file names

use coldpack::checkpoint::{CheckpointDocument, CheckpointStore, ConfigSnapshot};
use coldpack::JobIdentity;

#[test]
fn test_token_locates_the_same_checkpoint_across_runs() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());

    let identity = JobIdentity::new("s3://studies-db-prod", "Bermuda/", "s3://vault/cold").unwrap();
    let mut doc = CheckpointDocument::new(
        identity.token(),
        ConfigSnapshot {
            source: identity.source().to_string(),
            path: identity.path().to_string(),
            destination: identity.destination().to_string(),
        },
    );
    doc.discover("fetch/a", 1);
    store.save(&mut doc).unwrap();

    // A later invocation without the trailing slash derives the same token
    let again = JobIdentity::new("s3://studies-db-prod", "Bermuda", "s3://vault/cold").unwrap();
    assert_eq!(again.token(), identity.token());
    let loaded = store.load(again.token()).unwrap();
    assert_eq!(loaded.items().len(), 1);
}

#[test]
fn test_distinct_tuples_use_distinct_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());

    let tuples = [
        ("s3://bucket", "a/b", "s3://dst"),
        ("s3://bucket", "a_b", "s3://dst"),
        ("s3://bucket", "", "s3://dst"),
        ("s3://bucket", "a/b", "s3://other"),
        ("github://org", "", "s3://dst"),
    ];
    let mut paths = std::collections::HashSet::new();
    for (source, path, destination) in tuples {
        let identity = JobIdentity::new(source, path, destination).unwrap();
        assert!(paths.insert(store.path_for(identity.token())));
    }
}

#[test]
fn test_deeply_nested_paths_stay_flat_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path());

    let identity = JobIdentity::new(
        "s3://bucket",
        "level one/level two/level three (final)",
        "s3://dst",
    )
    .unwrap();
    let mut doc = CheckpointDocument::new(
        identity.token(),
        ConfigSnapshot {
            source: identity.source().to_string(),
            path: identity.path().to_string(),
            destination: identity.destination().to_string(),
        },
    );
    // The token never introduces subdirectories under the store
    store.save(&mut doc).unwrap();
    let path = store.path_for(identity.token());
    assert_eq!(path.parent().unwrap(), dir.path());
    assert!(path.exists());
}
