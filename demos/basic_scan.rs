//! Basic scan example.
//!
//! This example shows how to:
//! - Open an engine in a scratch directory
//! - Run a custom scan with auto-quarantine and watch its events
//! - Inspect the quarantine and export the history
//!
//! Run with: cargo run --example basic_scan

use scanward::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = scanward::init_logging(&LoggingConfig::default());

    println!("=== Scanward Basic Scan Example ===\n");

    let workspace = tempfile::tempdir()?;
    let downloads = workspace.path().join("downloads");
    std::fs::create_dir_all(&downloads)?;

    // An empty file matches the built-in "Empty File" signature.
    std::fs::write(downloads.join("installer.exe"), b"")?;
    std::fs::write(downloads.join("report.pdf"), b"quarterly numbers")?;
    std::fs::write(downloads.join("notes.txt"), b"not a monitored extension")?;

    let engine = Engine::open(EngineConfig::in_dir(workspace.path().join("state")))?
        .with_cloud_client(Arc::new(
            MockCloudClient::new_clean().with_latency(Duration::from_millis(20)),
        ));

    println!("Loaded {} signatures", engine.signature_count());

    let mut handle = engine.start_scan(
        ScanKind::Custom,
        ScanParams::new()
            .with_roots([&downloads])
            .with_cloud(true)
            .with_auto_quarantine(true),
    )?;

    while let Some(event) = handle.next_event().await {
        match event {
            ScanEvent::Started { total } => println!("Scanning {total} files"),
            ScanEvent::Verdict(v) if v.infected => {
                println!("  INFECTED {} ({}, via {})", v.path.display(), v.label_or_none(), v.method)
            }
            ScanEvent::Verdict(v) => println!("  clean    {}", v.path.display()),
            ScanEvent::Unscannable { path, reason } => {
                println!("  skipped  {} ({reason})", path.display())
            }
            ScanEvent::Quarantined { entry } => {
                println!("  isolated as {}", entry.quarantined_path.display())
            }
            ScanEvent::Finished(record) => println!(
                "\nFinished: {} scanned, {} found, {} removed",
                record.files_scanned, record.threats_found, record.threats_removed
            ),
            _ => {}
        }
    }
    handle.wait().await?;

    println!("\n=== Quarantine ===");
    for entry in engine.list_quarantine()? {
        println!("#{} {} [{}]", entry.id, entry.original_path.display(), entry.threat_label);
    }

    println!("\n=== History (CSV) ===");
    let csv = engine.export_history(ExportFormat::Csv)?;
    print!("{}", String::from_utf8_lossy(&csv));

    let report = engine.purge_all()?;
    println!("\nPurged {} quarantined files", report.purged.len());

    engine.shutdown()?;
    println!("\n=== Example Complete ===");
    Ok(())
}
