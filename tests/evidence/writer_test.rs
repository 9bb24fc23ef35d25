//! Evidence writer layout and persistence tests.

use proofgate::evidence::{EvidenceError, EvidenceWriter, REDACTION_MARKER};
use serde_json::json;

fn writer_in(dir: &tempfile::TempDir) -> EvidenceWriter {
    EvidenceWriter::new(dir.path(), "proofkit")
}

#[tokio::test]
async fn run_directory_layout_is_namespaced() {
    let root = tempfile::tempdir().expect("tempdir");
    let writer = writer_in(&root);

    let dir = writer
        .create_run_directory("req-1", "run-1")
        .await
        .expect("create");

    assert!(dir.is_dir());
    assert_eq!(
        dir,
        root.path()
            .join("artifacts")
            .join("proofkit")
            .join("req-1")
            .join("runs")
            .join("run-1")
    );
}

#[tokio::test]
async fn run_directory_creation_is_idempotent() {
    let root = tempfile::tempdir().expect("tempdir");
    let writer = writer_in(&root);

    let first = writer
        .create_run_directory("req-1", "run-1")
        .await
        .expect("first create");
    let second = writer
        .create_run_directory("req-1", "run-1")
        .await
        .expect("second create");

    assert_eq!(first, second);
}

#[tokio::test]
async fn artifacts_are_redacted_before_persistence() {
    let root = tempfile::tempdir().expect("tempdir");
    let writer = writer_in(&root);
    let dir = writer
        .create_run_directory("req-1", "run-1")
        .await
        .expect("create");

    let path = writer
        .write_artifact(&dir, "result.json", &json!({"token": "abc", "value": 1}))
        .await
        .expect("write");

    let contents = std::fs::read_to_string(&path).expect("read artifact");
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("valid JSON");
    assert_eq!(parsed["token"], REDACTION_MARKER);
    assert_eq!(parsed["value"], 1);
    assert!(
        !contents.contains("abc"),
        "no raw secret byte may reach storage"
    );
}

#[tokio::test]
async fn identifiers_escaping_the_tree_are_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    let writer = writer_in(&root);

    let err = writer
        .create_run_directory("../req-1", "run-1")
        .await
        .expect_err("traversal id must be rejected");
    assert!(matches!(err, EvidenceError::InvalidIdentifier(_)));

    let dir = writer
        .create_run_directory("req-1", "run-1")
        .await
        .expect("create");
    let err = writer
        .write_artifact(&dir, "../escape.json", &json!({}))
        .await
        .expect_err("traversal filename must be rejected");
    assert!(matches!(err, EvidenceError::InvalidIdentifier(_)));
}

#[tokio::test]
async fn directory_creation_failure_carries_run_context() {
    let root = tempfile::tempdir().expect("tempdir");
    // Occupy the artifacts path with a regular file so create_dir_all fails.
    std::fs::write(root.path().join("artifacts"), b"in the way").expect("write blocker");
    let writer = writer_in(&root);

    let err = writer
        .create_run_directory("req-9", "run-9")
        .await
        .expect_err("creation must fail");

    match err {
        EvidenceError::CreateDir {
            request_id, run_id, ..
        } => {
            assert_eq!(request_id, "req-9");
            assert_eq!(run_id, "run-9");
        }
        other => panic!("expected CreateDir, got {other:?}"),
    }
}

#[tokio::test]
async fn write_failure_carries_filename_context() {
    let root = tempfile::tempdir().expect("tempdir");
    let writer = writer_in(&root);
    let dir = writer
        .create_run_directory("req-1", "run-1")
        .await
        .expect("create");
    // A directory squatting on the artifact name makes the write fail.
    std::fs::create_dir(dir.join("result.json")).expect("blocker dir");

    let err = writer
        .write_artifact(&dir, "result.json", &json!({"value": 1}))
        .await
        .expect_err("write must fail");

    match err {
        EvidenceError::WriteArtifact { filename, .. } => assert_eq!(filename, "result.json"),
        other => panic!("expected WriteArtifact, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_creation_of_the_same_run_directory_is_safe() {
    let root = tempfile::tempdir().expect("tempdir");
    let writer = writer_in(&root);

    let (a, b) = tokio::join!(
        writer.create_run_directory("req-1", "run-1"),
        writer.create_run_directory("req-1", "run-1"),
    );

    assert_eq!(a.expect("first"), b.expect("second"));
}
