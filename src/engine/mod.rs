//! The caller-facing engine.
//!
//! [`Engine`] owns every piece of process-wide state (store connection,
//! signature table, quarantine area, scan slot) and exposes the operations
//! a GUI or CLI shell needs. It has an explicit lifecycle: [`Engine::open`]
//! builds it, [`Engine::shutdown`] closes the store.

mod gate;
mod handle;

pub use gate::ScanGate;
pub use handle::{ScanHandle, ScanParams};

use crate::cloud::ArcCloudClient;
use crate::config::EngineConfig;
use crate::core::error::{EngineResult, ScanError};
use crate::core::{FileHasher, ScanKind, ScanProgress, ScanRecord, ScanVerdict};
use crate::history::{self, ExportFormat};
use crate::quarantine::{PurgeReport, QuarantineEntry, QuarantineId, QuarantineManager};
use crate::scanner::{CancelFlag, Orchestrator, ScanRequest, ScanSink};
use crate::signatures::SignatureStore;
use crate::store::{Store, SETTING_CLOUD_DETECTION, SETTING_REAL_TIME_PROTECTION};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

/// A local malware-scanning engine.
///
/// # Example
///
/// ```rust,no_run
/// use scanward::prelude::*;
///
/// # async fn example() -> Result<(), EngineError> {
/// let engine = Engine::open(EngineConfig::in_dir("/var/lib/scanward"))?;
///
/// let mut handle = engine.start_scan(
///     ScanKind::Custom,
///     ScanParams::new().with_roots(["/home/user/Downloads"]),
/// )?;
/// while let Some(event) = handle.next_event().await {
///     if let ScanEvent::Verdict(v) = event {
///         if v.infected {
///             println!("{}: {}", v.path.display(), v.label_or_none());
///         }
///     }
/// }
/// let record = handle.wait().await?;
/// println!("{} files, {} threats", record.files_scanned, record.threats_found);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: Arc<Store>,
    signatures: Arc<SignatureStore>,
    quarantine: Arc<QuarantineManager>,
    orchestrator: Orchestrator,
    gate: Arc<ScanGate>,
}

impl Engine {
    /// Opens the engine with the database at `config.database_path`.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let store = Store::open(&config.database_path)?;
        Self::open_with_store(config, store)
    }

    /// Opens the engine on an already opened store.
    pub fn open_with_store(mut config: EngineConfig, store: Store) -> EngineResult<Self> {
        config.normalize();
        config.validate()?;

        let store = Arc::new(store);
        let hasher = FileHasher::new().with_chunk_size(config.hash_chunk_size);

        let signatures = Arc::new(match &config.signature_file {
            Some(path) => SignatureStore::load_file(path)?,
            None => SignatureStore::builtin(),
        });

        let quarantine = Arc::new(QuarantineManager::new(
            &config.quarantine_dir,
            Arc::clone(&store),
            hasher.clone(),
        )?);

        let orchestrator = Orchestrator::new(
            Arc::clone(&signatures),
            hasher,
            Arc::clone(&quarantine),
            Arc::clone(&store),
        );

        info!(
            signatures = signatures.len(),
            quarantine = %config.quarantine_dir.display(),
            "Engine opened"
        );

        Ok(Self {
            config,
            store,
            signatures,
            quarantine,
            orchestrator,
            gate: Arc::new(ScanGate::new()),
        })
    }

    /// Attaches the cloud verdict service.
    pub fn with_cloud_client(mut self, client: ArcCloudClient) -> Self {
        info!(service = client.name(), "Cloud client attached");
        self.orchestrator = self
            .orchestrator
            .with_cloud_client(client, self.config.cloud_timeout);
        self
    }

    /// The effective configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Scanning ─────────────────────────────────────────────────

    /// Starts a scan on the current tokio runtime.
    ///
    /// Only one scan runs at a time; while one is active this fails with
    /// [`ScanError::ScanInProgress`].
    pub fn start_scan(&self, kind: ScanKind, params: ScanParams) -> EngineResult<ScanHandle> {
        let request = self.build_request(kind, params)?;
        request.validate()?;

        let permit = self.gate.try_acquire().ok_or(ScanError::ScanInProgress)?;

        let id = Uuid::new_v4().to_string();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = watch::channel(ScanProgress::default());
        let cancel = CancelFlag::new();

        let orchestrator = self.orchestrator.clone();
        let task_id = id.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            let sink = ScanSink::new(events_tx, progress_tx);
            let result = orchestrator.run(&task_id, request, task_cancel, sink).await;
            if let Err(e) = &result {
                warn!(scan_id = %task_id, error = %e, "Scan failed");
            }
            result
        });

        info!(scan_id = %id, kind = %kind, "Scan started");
        Ok(ScanHandle::new(id, events_rx, progress_rx, cancel, task))
    }

    /// Requests cancellation of a running scan.
    pub fn cancel_scan(&self, handle: &ScanHandle) {
        handle.cancel();
    }

    /// Subscribes to a scan's progress.
    pub fn subscribe_progress(&self, handle: &ScanHandle) -> watch::Receiver<ScanProgress> {
        handle.progress()
    }

    /// Returns `true` while a scan is running.
    pub fn is_scan_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Evaluates a single file outside of any scan run.
    pub async fn scan_file(&self, path: impl AsRef<Path>) -> EngineResult<ScanVerdict> {
        let cloud = self.cloud_detection()?;
        Ok(self.orchestrator.evaluate(path.as_ref(), cloud).await?)
    }

    fn build_request(&self, kind: ScanKind, params: ScanParams) -> EngineResult<ScanRequest> {
        let roots: Vec<PathBuf> = match (params.roots, kind) {
            (Some(roots), _) => roots,
            (None, ScanKind::Quick) => self.config.quick_scan_roots.clone(),
            (None, ScanKind::Full) => self.config.full_scan_roots.clone(),
            (None, ScanKind::Custom) => Vec::new(),
        };
        let extensions = params.extensions.unwrap_or_else(|| match kind {
            ScanKind::Quick => self.config.quick_extensions.clone(),
            ScanKind::Full | ScanKind::Custom => self.config.extensions.clone(),
        });
        let cloud = match params.cloud_enabled {
            Some(enabled) => enabled,
            None => self.cloud_detection()?,
        };

        Ok(ScanRequest::new(kind, roots, extensions)
            .with_cloud(cloud)
            .with_auto_quarantine(params.auto_quarantine))
    }

    // ── Quarantine ───────────────────────────────────────────────

    /// Moves `path` into quarantine.
    pub fn isolate(&self, path: impl AsRef<Path>, threat_label: &str) -> EngineResult<QuarantineEntry> {
        Ok(self.quarantine.isolate(path.as_ref(), threat_label)?)
    }

    /// Restores an entry to its original location.
    pub fn restore(&self, id: QuarantineId) -> EngineResult<QuarantineEntry> {
        Ok(self.quarantine.restore(id)?)
    }

    /// Restores an entry into `destination_dir`.
    pub fn restore_to(&self, id: QuarantineId, destination_dir: impl AsRef<Path>) -> EngineResult<QuarantineEntry> {
        Ok(self.quarantine.restore_to(id, destination_dir.as_ref())?)
    }

    /// Deletes an entry and its file.
    pub fn purge(&self, id: QuarantineId) -> EngineResult<QuarantineEntry> {
        Ok(self.quarantine.purge(id)?)
    }

    /// Purges every entry, best-effort.
    pub fn purge_all(&self) -> EngineResult<PurgeReport> {
        Ok(self.quarantine.purge_all()?)
    }

    /// Lists active quarantine entries, most recent first.
    pub fn list_quarantine(&self) -> EngineResult<Vec<QuarantineEntry>> {
        Ok(self.quarantine.list_active()?)
    }

    // ── History ──────────────────────────────────────────────────

    /// Lists scan records, most recent first.
    pub fn list_history(&self) -> EngineResult<Vec<ScanRecord>> {
        Ok(self.store.list_scan_records()?)
    }

    /// Deletes every scan record. Returns the number removed.
    pub fn clear_history(&self) -> EngineResult<usize> {
        let removed = self.store.clear_scan_history()?;
        info!(removed, "Scan history cleared");
        Ok(removed)
    }

    /// Serialises the history log.
    pub fn export_history(&self, format: ExportFormat) -> EngineResult<Vec<u8>> {
        let records = self.store.list_scan_records()?;
        history::export(&records, format)
    }

    /// Serialises the history log to a file.
    pub fn export_history_to(&self, path: impl AsRef<Path>, format: ExportFormat) -> EngineResult<()> {
        let bytes = self.export_history(format)?;
        history::write_export(path.as_ref(), &bytes)
    }

    // ── Signatures ───────────────────────────────────────────────

    /// Reloads the configured signature file, swapping the table atomically.
    ///
    /// A scan already running keeps the table it started with until it
    /// ends; the new table applies to later scans and to [`scan_file`](Self::scan_file).
    pub fn reload_signatures(&self) -> EngineResult<usize> {
        Ok(self.signatures.reload_from_source()?)
    }

    /// Number of loaded signatures.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Every persisted setting.
    pub fn settings(&self) -> EngineResult<BTreeMap<String, String>> {
        Ok(self.store.all_settings()?)
    }

    /// Reads one setting.
    pub fn setting(&self, key: &str) -> EngineResult<Option<String>> {
        Ok(self.store.get_setting(key)?)
    }

    /// Writes one setting.
    pub fn set_setting(&self, key: &str, value: &str) -> EngineResult<()> {
        Ok(self.store.set_setting(key, value)?)
    }

    /// Persists the cloud detection toggle.
    pub fn set_cloud_detection(&self, enabled: bool) -> EngineResult<()> {
        self.set_setting(SETTING_CLOUD_DETECTION, if enabled { "true" } else { "false" })
    }

    /// Whether new scans submit files to the cloud by default.
    ///
    /// The persisted setting wins over the configuration.
    pub fn cloud_detection(&self) -> EngineResult<bool> {
        match self.store.get_setting(SETTING_CLOUD_DETECTION)? {
            Some(value) => match parse_flag(&value) {
                Some(enabled) => Ok(enabled),
                None => {
                    warn!(value = %value, "Unrecognised cloud_detection setting, using configuration");
                    Ok(self.config.cloud_enabled)
                }
            },
            None => Ok(self.config.cloud_enabled),
        }
    }

    /// Persists the real-time protection flag for front ends.
    ///
    /// The engine has no filesystem watcher; the flag is only stored.
    pub fn set_real_time_protection(&self, enabled: bool) -> EngineResult<()> {
        self.set_setting(SETTING_REAL_TIME_PROTECTION, if enabled { "true" } else { "false" })
    }

    /// The stored real-time protection flag, `false` when unset or unrecognised.
    pub fn real_time_protection(&self) -> EngineResult<bool> {
        Ok(self
            .store
            .get_setting(SETTING_REAL_TIME_PROTECTION)?
            .and_then(|value| parse_flag(&value))
            .unwrap_or(false))
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Closes the store. Operations touching it fail afterwards.
    ///
    /// A running scan is cancelled first by the caller's handle, if any;
    /// its record write fails once the store is closed.
    pub fn shutdown(&self) -> EngineResult<()> {
        if self.is_scan_active() {
            warn!("Shutting down while a scan is active");
        }
        self.store.close()?;
        info!("Engine shut down");
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
