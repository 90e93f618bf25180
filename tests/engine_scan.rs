//! End-to-end scan runs through the engine facade.

use async_trait::async_trait;
use scanward::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn files(&self) -> PathBuf {
        let path = self.dir.path().join("files");
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.files().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config(&self) -> EngineConfig {
        EngineConfig::in_dir(self.dir.path().join("state"))
    }

    fn engine(&self) -> Engine {
        Engine::open(self.config()).unwrap()
    }
}

/// Holds its `pause_at`-th submission until released.
#[derive(Debug)]
struct PausingClient {
    pause_at: u64,
    calls: AtomicU64,
    reached: Arc<Notify>,
    release: Arc<Notify>,
}

impl PausingClient {
    fn new(pause_at: u64) -> Self {
        Self {
            pause_at,
            calls: AtomicU64::new(0),
            reached: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl CloudVerdictClient for PausingClient {
    fn name(&self) -> &str {
        "pausing"
    }

    async fn submit(&self, _path: &Path) -> Result<CloudVerdict, CloudError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.pause_at {
            self.reached.notify_one();
            self.release.notified().await;
        }
        Ok(CloudVerdict::clean())
    }
}

#[tokio::test]
async fn test_empty_exe_is_flagged_as_empty_file() {
    let ws = Workspace::new();
    ws.write("empty.exe", b"");
    ws.write("hello.exe", b"hello world");

    let engine = ws.engine();
    let mut handle = engine
        .start_scan(ScanKind::Custom, ScanParams::new().with_roots([ws.files()]))
        .unwrap();

    let mut verdicts = Vec::new();
    while let Some(event) = handle.next_event().await {
        if let ScanEvent::Verdict(v) = event {
            verdicts.push(v);
        }
    }
    let record = handle.wait().await.unwrap();

    assert_eq!(record.files_scanned, 2);
    assert_eq!(record.threats_found, 1);
    assert!(record.completed);

    let empty = verdicts
        .iter()
        .find(|v| v.path.ends_with("empty.exe"))
        .unwrap();
    assert!(empty.infected);
    assert_eq!(empty.threat_label.as_deref(), Some("Empty File"));

    let clean = verdicts
        .iter()
        .find(|v| v.path.ends_with("hello.exe"))
        .unwrap();
    assert!(!clean.infected);
}

#[tokio::test]
async fn test_progress_reaches_total() {
    let ws = Workspace::new();
    for i in 0..5 {
        ws.write(&format!("f{i}.pdf"), format!("content {i}").as_bytes());
    }

    let engine = ws.engine();
    let handle = engine
        .start_scan(ScanKind::Custom, ScanParams::new().with_roots([ws.files()]))
        .unwrap();
    let progress = engine.subscribe_progress(&handle);
    handle.wait().await.unwrap();

    let last = *progress.borrow();
    assert_eq!(last.scanned, 5);
    assert_eq!(last.total, 5);
    assert_eq!(last.percent(), 100);
}

#[tokio::test]
async fn test_cancel_after_n_files_records_partial_run() {
    let ws = Workspace::new();
    for i in 0..6 {
        ws.write(&format!("f{i}.exe"), format!("payload {i}").as_bytes());
    }

    let client = Arc::new(PausingClient::new(3));
    let reached = Arc::clone(&client.reached);
    let release = Arc::clone(&client.release);

    let engine = ws.engine().with_cloud_client(client);
    let handle = engine
        .start_scan(
            ScanKind::Custom,
            ScanParams::new().with_roots([ws.files()]).with_cloud(true),
        )
        .unwrap();

    reached.notified().await;
    engine.cancel_scan(&handle);
    release.notify_one();

    let record = handle.wait().await.unwrap();
    assert_eq!(record.files_scanned, 3);
    assert!(!record.completed);

    let history = engine.list_history().unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].completed);
}

#[tokio::test]
async fn test_concurrent_scan_is_rejected() {
    let ws = Workspace::new();
    ws.write("a.exe", b"a");
    ws.write("b.exe", b"b");

    let client = Arc::new(PausingClient::new(1));
    let reached = Arc::clone(&client.reached);
    let release = Arc::clone(&client.release);

    let engine = ws.engine().with_cloud_client(client);
    let first = engine
        .start_scan(
            ScanKind::Custom,
            ScanParams::new().with_roots([ws.files()]).with_cloud(true),
        )
        .unwrap();

    reached.notified().await;
    assert!(engine.is_scan_active());

    let err = engine
        .start_scan(ScanKind::Custom, ScanParams::new().with_roots([ws.files()]))
        .unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::ScanInProgress)));

    release.notify_one();
    first.wait().await.unwrap();

    // the slot is free again once the first run has ended
    let second = engine
        .start_scan(ScanKind::Custom, ScanParams::new().with_roots([ws.files()]))
        .unwrap();
    second.wait().await.unwrap();
    assert!(!engine.is_scan_active());
    assert_eq!(engine.list_history().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cloud_timeout_degrades_to_signature_only() {
    let ws = Workspace::new();
    let path = ws.write("slow.exe", b"not in any signature");

    let config = ws.config().with_cloud_timeout(Duration::from_millis(50));
    let engine = Engine::open(config).unwrap().with_cloud_client(Arc::new(
        MockCloudClient::new_infected(["Never.Seen"]).with_latency(Duration::from_secs(10)),
    ));
    engine.set_cloud_detection(true).unwrap();

    let verdict = engine.scan_file(&path).await.unwrap();
    assert!(!verdict.infected);
    assert_eq!(verdict.method, DetectionMethod::Signature);
    assert!(verdict.cloud_unavailable);
}

#[tokio::test]
async fn test_unreadable_file_is_never_clean() {
    let ws = Workspace::new();
    let engine = ws.engine();
    let err = engine
        .scan_file(ws.files().join("does-not-exist.exe"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::UnreadableFile { .. })));
}

#[tokio::test]
async fn test_auto_quarantine_counts_removed_threats() {
    let ws = Workspace::new();
    let infected = ws.write("nested/dropper.exe", b"");
    ws.write("clean.zip", b"zip bytes");

    let engine = ws.engine();
    let handle = engine
        .start_scan(
            ScanKind::Custom,
            ScanParams::new()
                .with_roots([ws.files()])
                .with_auto_quarantine(true),
        )
        .unwrap();
    let record = handle.wait().await.unwrap();

    assert_eq!(record.threats_found, 1);
    assert_eq!(record.threats_removed, 1);
    assert!(!infected.exists());

    let entries = engine.list_quarantine().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].original_path, infected);
    assert_eq!(entries[0].threat_label, "Empty File");
}

#[tokio::test]
async fn test_empty_root_records_zero_file_run() {
    let ws = Workspace::new();
    let engine = ws.engine();
    let handle = engine
        .start_scan(ScanKind::Custom, ScanParams::new().with_roots([ws.files()]))
        .unwrap();
    let record = handle.wait().await.unwrap();

    assert_eq!(record.files_scanned, 0);
    assert!(record.completed);
    assert_eq!(engine.list_history().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_root_is_counted_as_skipped() {
    let ws = Workspace::new();
    ws.write("a.exe", b"a");

    let engine = ws.engine();
    let handle = engine
        .start_scan(
            ScanKind::Custom,
            ScanParams::new().with_roots([ws.files(), ws.dir.path().join("missing")]),
        )
        .unwrap();
    let record = handle.wait().await.unwrap();

    assert_eq!(record.files_scanned, 1);
    assert_eq!(record.dirs_skipped, 1);
    assert!(record.completed);
    assert!(record.detail_note.contains("1 directories skipped"));
}

#[tokio::test]
async fn test_custom_scan_without_roots_fails_fast() {
    let ws = Workspace::new();
    let engine = ws.engine();
    let err = engine
        .start_scan(ScanKind::Custom, ScanParams::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Scan(ScanError::Configuration { .. })));
    assert!(!engine.is_scan_active());
}

#[tokio::test]
async fn test_reloaded_signatures_apply_to_next_scan() {
    let ws = Workspace::new();
    let sample = ws.write("sample.doc", b"freshly catalogued sample");
    let md5 = FileHasher::new().hash_bytes(b"freshly catalogued sample").md5;

    let sig_file = ws.dir.path().join("signatures.txt");
    std::fs::write(&sig_file, "# no custom signatures yet\n").unwrap();

    let engine = Engine::open(ws.config().with_signature_file(&sig_file)).unwrap();
    assert!(!engine.scan_file(&sample).await.unwrap().infected);

    std::fs::write(&sig_file, format!("{md5}\tTest.Sample\n")).unwrap();
    engine.reload_signatures().unwrap();

    let verdict = engine.scan_file(&sample).await.unwrap();
    assert!(verdict.infected);
    assert_eq!(verdict.threat_label.as_deref(), Some("Test.Sample"));
}

#[tokio::test]
async fn test_reload_during_scan_keeps_run_table() {
    let ws = Workspace::new();
    let content = b"identical sample body";
    for i in 0..4 {
        ws.write(&format!("copy{i}.exe"), content);
    }
    let md5 = FileHasher::new().hash_bytes(content).md5;

    let sig_file = ws.dir.path().join("signatures.txt");
    std::fs::write(&sig_file, "").unwrap();

    let client = Arc::new(PausingClient::new(2));
    let reached = Arc::clone(&client.reached);
    let release = Arc::clone(&client.release);

    let engine = Engine::open(ws.config().with_signature_file(&sig_file))
        .unwrap()
        .with_cloud_client(client);
    let mut handle = engine
        .start_scan(
            ScanKind::Custom,
            ScanParams::new().with_roots([ws.files()]).with_cloud(true),
        )
        .unwrap();

    reached.notified().await;
    std::fs::write(&sig_file, format!("{md5}\tTest.Identical\n")).unwrap();
    engine.reload_signatures().unwrap();
    release.notify_one();

    let mut infected = Vec::new();
    while let Some(event) = handle.next_event().await {
        if let ScanEvent::Verdict(v) = event {
            infected.push(v.infected);
        }
    }
    let record = handle.wait().await.unwrap();

    assert_eq!(infected, vec![false; 4]);
    assert_eq!(record.threats_found, 0);

    // the reloaded table applies from the next evaluation on
    let verdict = engine.scan_file(ws.files().join("copy0.exe")).await.unwrap();
    assert!(verdict.infected);
    assert_eq!(verdict.threat_label.as_deref(), Some("Test.Identical"));
}
