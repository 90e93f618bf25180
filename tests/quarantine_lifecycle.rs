//! Isolate, restore and purge through the engine, checked against disk.

use scanward::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup() -> (TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::open(EngineConfig::in_dir(dir.path().join("state"))).unwrap();
    (dir, engine)
}

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn area_is_empty(engine: &Engine) -> bool {
    std::fs::read_dir(&engine.config().quarantine_dir)
        .unwrap()
        .next()
        .is_none()
}

#[test]
fn test_isolate_then_purge_all_leaves_nothing_behind() {
    let (dir, engine) = setup();
    let path = write(dir.path(), "x.exe", b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR");

    let entry = engine.isolate(&path, "EICAR").unwrap();
    assert!(!path.exists());
    assert!(entry.quarantined_path.exists());
    let area = std::fs::canonicalize(&engine.config().quarantine_dir).unwrap();
    assert!(entry.quarantined_path.starts_with(&area));
    assert_eq!(entry.original_path, path);
    assert_eq!(entry.threat_label, "EICAR");
    assert_eq!(engine.list_quarantine().unwrap().len(), 1);

    let report = engine.purge_all().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.purged, vec![entry.id]);
    assert!(engine.list_quarantine().unwrap().is_empty());
    assert!(area_is_empty(&engine));
}

#[test]
fn test_restore_round_trip_is_byte_identical() {
    let (dir, engine) = setup();
    let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let path = write(dir.path(), "payload.doc", &content);

    let entry = engine.isolate(&path, "Test.Payload").unwrap();
    let restored = engine.restore(entry.id).unwrap();

    assert_eq!(restored.original_path, path);
    assert_eq!(std::fs::read(&path).unwrap(), content);
    assert!(!entry.quarantined_path.exists());
    assert!(engine.list_quarantine().unwrap().is_empty());
}

#[test]
fn test_restore_into_other_directory_keeps_file_name() {
    let (dir, engine) = setup();
    let path = write(dir.path(), "invoice.pdf", b"pdf");
    let target = dir.path().join("recovered");
    std::fs::create_dir_all(&target).unwrap();

    let entry = engine.isolate(&path, "Test.Pdf").unwrap();
    let restored = engine.restore_to(entry.id, &target).unwrap();

    assert_eq!(restored.original_path, target.join("invoice.pdf"));
    assert_eq!(std::fs::read(target.join("invoice.pdf")).unwrap(), b"pdf");
    assert!(!path.exists());
}

#[test]
fn test_restore_refuses_to_overwrite() {
    let (dir, engine) = setup();
    let path = write(dir.path(), "report.doc", b"infected");
    let entry = engine.isolate(&path, "Test.Doc").unwrap();

    // a new file took the original name in the meantime
    write(dir.path(), "report.doc", b"new work");

    let err = engine.restore(entry.id).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Quarantine(QuarantineError::Restore { .. })
    ));
    assert_eq!(std::fs::read(&path).unwrap(), b"new work");
    assert!(entry.quarantined_path.exists());
    assert_eq!(engine.list_quarantine().unwrap().len(), 1);
}

#[test]
fn test_purge_with_missing_file_still_removes_entry() {
    let (dir, engine) = setup();
    let path = write(dir.path(), "gone.exe", b"bytes");
    let entry = engine.isolate(&path, "Test.Gone").unwrap();

    std::fs::remove_file(&entry.quarantined_path).unwrap();

    let err = engine.purge(entry.id).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Quarantine(QuarantineError::Purge {
            entry_removed: true,
            ..
        })
    ));
    assert!(engine.list_quarantine().unwrap().is_empty());
}

#[test]
fn test_unknown_entry_is_not_found() {
    let (_dir, engine) = setup();
    for err in [
        engine.restore(QuarantineId(404)).unwrap_err(),
        engine.purge(QuarantineId(404)).unwrap_err(),
    ] {
        assert!(matches!(
            err,
            EngineError::Quarantine(QuarantineError::NotFound { id: 404 })
        ));
    }
}

#[test]
fn test_same_name_from_two_directories_gets_distinct_slots() {
    let (dir, engine) = setup();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    std::fs::create_dir_all(&a).unwrap();
    std::fs::create_dir_all(&b).unwrap();
    let first = engine
        .isolate(write(&a, "setup.exe", b"one"), "Test.One")
        .unwrap();
    let second = engine
        .isolate(write(&b, "setup.exe", b"two"), "Test.Two")
        .unwrap();

    assert_ne!(first.quarantined_path, second.quarantined_path);
    assert_eq!(std::fs::read(&first.quarantined_path).unwrap(), b"one");
    assert_eq!(std::fs::read(&second.quarantined_path).unwrap(), b"two");

    engine.restore(first.id).unwrap();
    engine.restore(second.id).unwrap();
    assert_eq!(std::fs::read(a.join("setup.exe")).unwrap(), b"one");
    assert_eq!(std::fs::read(b.join("setup.exe")).unwrap(), b"two");
}

#[test]
fn test_quarantine_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::in_dir(dir.path().join("state"));
    let path = write(dir.path(), "kept.zip", b"zip");

    let id = {
        let engine = Engine::open(config.clone()).unwrap();
        let entry = engine.isolate(&path, "Test.Zip").unwrap();
        engine.shutdown().unwrap();
        entry.id
    };

    let engine = Engine::open(config).unwrap();
    let entries = engine.list_quarantine().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);
    assert_eq!(entries[0].threat_label, "Test.Zip");

    engine.restore(id).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"zip");
}
