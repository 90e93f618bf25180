//! Drives one scan run: enumerate, evaluate each candidate, persist the record.

use crate::audit::{emit_scan_finished, emit_scan_started, emit_threat_detected};
use crate::cloud::{submit_with_timeout, ArcCloudClient};
use crate::core::error::{CloudError, ScanError, ScanResult};
use crate::core::{FileCandidate, FileHasher, NewScanRecord, ScanKind, ScanProgress, ScanRecord, ScanTally, ScanVerdict};
use crate::quarantine::{QuarantineEntry, QuarantineManager};
use crate::scanner::walk::{enumerate, ExtensionFilter};
use crate::signatures::{SignatureStore, SignatureTable};
use crate::store::Store;
use crate::verdict::{combine, CloudResult, SignatureResult};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Cooperative cancellation signal, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Kind recorded in history.
    pub kind: ScanKind,
    /// Roots walked in order.
    pub roots: Vec<PathBuf>,
    /// Extensions selecting candidates; empty selects every file.
    pub extensions: Vec<String>,
    /// Whether each file is also submitted to the cloud service.
    pub cloud_enabled: bool,
    /// Whether infected files are isolated during the run.
    pub auto_quarantine: bool,
}

impl ScanRequest {
    /// Creates a request with cloud detection and auto-quarantine off.
    pub fn new<R, E>(kind: ScanKind, roots: R, extensions: E) -> Self
    where
        R: IntoIterator,
        R::Item: Into<PathBuf>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            kind,
            roots: roots.into_iter().map(Into::into).collect(),
            extensions: extensions.into_iter().map(Into::into).collect(),
            cloud_enabled: false,
            auto_quarantine: false,
        }
    }

    /// Enables or disables cloud detection.
    pub fn with_cloud(mut self, enabled: bool) -> Self {
        self.cloud_enabled = enabled;
        self
    }

    /// Enables or disables auto-quarantine.
    pub fn with_auto_quarantine(mut self, enabled: bool) -> Self {
        self.auto_quarantine = enabled;
        self
    }

    /// Rejects requests with no roots.
    pub fn validate(&self) -> ScanResult<()> {
        if self.roots.is_empty() {
            return Err(ScanError::configuration(format!(
                "{} requires at least one root",
                self.kind.label()
            )));
        }
        Ok(())
    }
}

/// Events emitted while a scan runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Enumeration finished; `total` candidates will be evaluated.
    Started {
        /// Number of candidates.
        total: u64,
    },
    /// One more candidate was evaluated.
    Progress(ScanProgress),
    /// Verdict for one file.
    Verdict(ScanVerdict),
    /// A file could not be read and was not evaluated.
    Unscannable {
        /// Path of the file.
        path: PathBuf,
        /// Why it could not be read.
        reason: String,
    },
    /// A directory or root could not be listed.
    DirectorySkipped {
        /// Path of the directory.
        path: PathBuf,
        /// Why it could not be listed.
        reason: String,
    },
    /// An infected file was isolated.
    Quarantined {
        /// The new quarantine entry.
        entry: QuarantineEntry,
    },
    /// The run ended and its record was persisted.
    Finished(ScanRecord),
}

/// Output channels for one run.
#[derive(Debug)]
pub struct ScanSink {
    events: mpsc::UnboundedSender<ScanEvent>,
    progress: watch::Sender<ScanProgress>,
}

impl ScanSink {
    /// Wraps the event and progress senders.
    pub fn new(events: mpsc::UnboundedSender<ScanEvent>, progress: watch::Sender<ScanProgress>) -> Self {
        Self { events, progress }
    }

    fn emit(&self, event: ScanEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn publish_progress(&self, progress: ScanProgress) {
        self.progress.send_replace(progress);
        self.emit(ScanEvent::Progress(progress));
    }
}

/// Evaluates files and runs scans against shared engine state.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    signatures: Arc<SignatureStore>,
    cloud: Option<ArcCloudClient>,
    cloud_timeout: Duration,
    hasher: FileHasher,
    quarantine: Arc<QuarantineManager>,
    store: Arc<Store>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    pub fn new(
        signatures: Arc<SignatureStore>,
        hasher: FileHasher,
        quarantine: Arc<QuarantineManager>,
        store: Arc<Store>,
    ) -> Self {
        Self {
            signatures,
            cloud: None,
            cloud_timeout: Duration::from_secs(30),
            hasher,
            quarantine,
            store,
        }
    }

    /// Sets the cloud client and its per-submission timeout.
    pub fn with_cloud_client(mut self, client: ArcCloudClient, timeout: Duration) -> Self {
        self.cloud = Some(client);
        self.cloud_timeout = timeout;
        self
    }

    /// Returns the configured cloud client.
    pub fn cloud_client(&self) -> Option<&ArcCloudClient> {
        self.cloud.as_ref()
    }

    /// Evaluates one file against the current signature table.
    ///
    /// Fails with [`ScanError::UnreadableFile`] when the content cannot be
    /// fingerprinted; such a file has no verdict.
    pub async fn evaluate(&self, path: &Path, cloud_enabled: bool) -> ScanResult<ScanVerdict> {
        let table = self.signatures.snapshot();
        self.evaluate_with(&table, path, cloud_enabled).await
    }

    async fn evaluate_with(
        &self,
        table: &SignatureTable,
        path: &Path,
        cloud_enabled: bool,
    ) -> ScanResult<ScanVerdict> {
        let candidate = FileCandidate::new(path);
        let hasher = self.hasher.clone();
        let candidate = tokio::task::spawn_blocking(move || {
            candidate.digest(&hasher)?;
            Ok::<_, ScanError>(candidate)
        })
        .await
        .map_err(|e| ScanError::internal(format!("hashing task failed: {e}")))??;

        let hash = candidate
            .cached_digest()
            .ok_or_else(|| ScanError::internal("digest missing after hashing"))?;

        let signature = match table.lookup_hash(hash) {
            Some(label) => SignatureResult::hit(label),
            None => SignatureResult::miss(),
        };

        let cloud = if !cloud_enabled {
            CloudResult::NotRequested
        } else {
            match &self.cloud {
                Some(client) => {
                    submit_with_timeout(client.as_ref(), candidate.path(), self.cloud_timeout)
                        .await
                        .into()
                }
                None => CloudResult::Unavailable(CloudError::network(
                    "cloud",
                    "no cloud client configured",
                )),
            }
        };

        if let CloudResult::Unavailable(e) = &cloud {
            warn!(path = %path.display(), error = %e, kind = ?e.kind(), "Cloud verdict unavailable");
        }

        Ok(combine(candidate.into_path(), signature, cloud))
    }

    /// Runs a whole scan and persists its record.
    ///
    /// Per-file and per-directory failures are counted and reported as
    /// events; only a failure to persist the record fails the run.
    pub async fn run(
        &self,
        scan_id: &str,
        request: ScanRequest,
        cancel: CancelFlag,
        sink: ScanSink,
    ) -> ScanResult<ScanRecord> {
        request.validate()?;

        let filter = ExtensionFilter::new(&request.extensions);
        let roots = request.roots.clone();
        let walk_cancel = cancel.clone();
        let enumeration =
            tokio::task::spawn_blocking(move || enumerate(&roots, &filter, &walk_cancel))
                .await
                .map_err(|e| ScanError::internal(format!("enumeration task failed: {e}")))?;

        let mut tally = ScanTally::default();
        for skipped in enumeration.skipped {
            tally.dirs_skipped += 1;
            if let ScanError::DirectoryAccess { path, reason } = skipped {
                sink.emit(ScanEvent::DirectorySkipped { path, reason });
            }
        }

        let total = enumeration.candidates.len() as u64;
        emit_scan_started(scan_id, request.kind, total, request.cloud_enabled);
        sink.emit(ScanEvent::Started { total });
        sink.publish_progress(ScanProgress::new(0, total));

        // one table for the whole run; reloads apply from the next scan
        let table = self.signatures.snapshot();
        let mut completed = !cancel.is_cancelled();
        for path in enumeration.candidates {
            if cancel.is_cancelled() {
                completed = false;
                break;
            }

            match self.evaluate_with(&table, &path, request.cloud_enabled).await {
                Ok(verdict) => {
                    if verdict.cloud_unavailable {
                        tally.cloud_unavailable += 1;
                    }
                    if verdict.infected {
                        tally.threats_found += 1;
                        emit_threat_detected(scan_id, &verdict);
                        if request.auto_quarantine {
                            if let Some(entry) = self.isolate_infected(&verdict).await {
                                tally.threats_removed += 1;
                                sink.emit(ScanEvent::Quarantined { entry });
                            }
                        }
                    }
                    sink.emit(ScanEvent::Verdict(verdict));
                }
                Err(e) => {
                    tally.files_unscannable += 1;
                    warn!(path = %path.display(), error = %e, "File unscannable");
                    sink.emit(ScanEvent::Unscannable {
                        path,
                        reason: e.to_string(),
                    });
                }
            }

            tally.files_scanned += 1;
            sink.publish_progress(ScanProgress::new(tally.files_scanned, total));
        }

        let record = self
            .store
            .append_scan_record(&NewScanRecord::new(request.kind, tally, completed))?;

        info!(
            scan_id,
            kind = %request.kind,
            files_scanned = record.files_scanned,
            threats_found = record.threats_found,
            completed,
            "Scan finished"
        );
        emit_scan_finished(scan_id, &record);
        sink.emit(ScanEvent::Finished(record.clone()));
        Ok(record)
    }

    async fn isolate_infected(&self, verdict: &ScanVerdict) -> Option<QuarantineEntry> {
        let manager = Arc::clone(&self.quarantine);
        let path = verdict.path.clone();
        let label = verdict.label_or_none().to_string();

        match tokio::task::spawn_blocking(move || manager.isolate(&path, &label)).await {
            Ok(Ok(entry)) => Some(entry),
            Ok(Err(e)) => {
                warn!(path = %verdict.path.display(), error = %e, "Auto-quarantine failed");
                None
            }
            Err(e) => {
                warn!(path = %verdict.path.display(), error = %e, "Auto-quarantine task failed");
                None
            }
        }
    }
}
