//! Per-scan parameters and the handle returned by [`Engine::start_scan`](crate::Engine::start_scan).

use crate::core::error::{EngineResult, ScanError, ScanResult};
use crate::core::{ScanProgress, ScanRecord};
use crate::scanner::{CancelFlag, ScanEvent};

use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Per-scan overrides of the engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanParams {
    /// Roots to walk. Required for custom scans; defaults from configuration otherwise.
    pub roots: Option<Vec<PathBuf>>,
    /// Extension filter. Defaults from configuration.
    pub extensions: Option<Vec<String>>,
    /// Cloud detection for this run. Defaults to the persisted setting.
    pub cloud_enabled: Option<bool>,
    /// Isolate infected files during the run.
    pub auto_quarantine: bool,
}

impl ScanParams {
    /// Creates empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the roots.
    pub fn with_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots = Some(roots.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the extension filter.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Forces cloud detection on or off for this run.
    pub fn with_cloud(mut self, enabled: bool) -> Self {
        self.cloud_enabled = Some(enabled);
        self
    }

    /// Enables or disables auto-quarantine.
    pub fn with_auto_quarantine(mut self, enabled: bool) -> Self {
        self.auto_quarantine = enabled;
        self
    }
}

/// A handle to a running scan.
///
/// Dropping the handle does not stop the scan; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct ScanHandle {
    id: String,
    events: mpsc::UnboundedReceiver<ScanEvent>,
    progress: watch::Receiver<ScanProgress>,
    cancel: CancelFlag,
    task: JoinHandle<ScanResult<ScanRecord>>,
}

impl ScanHandle {
    pub(crate) fn new(
        id: String,
        events: mpsc::UnboundedReceiver<ScanEvent>,
        progress: watch::Receiver<ScanProgress>,
        cancel: CancelFlag,
        task: JoinHandle<ScanResult<ScanRecord>>,
    ) -> Self {
        Self {
            id,
            events,
            progress,
            cancel,
            task,
        }
    }

    /// Unique id of this run.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// A fresh subscription to `(scanned, total)` progress.
    ///
    /// The receiver always holds the latest value; a slow reader skips
    /// intermediate values instead of slowing the scan.
    pub fn progress(&self) -> watch::Receiver<ScanProgress> {
        self.progress.clone()
    }

    /// The event stream of this run.
    pub fn events(&mut self) -> &mut mpsc::UnboundedReceiver<ScanEvent> {
        &mut self.events
    }

    /// Waits for the next event; `None` once the run has ended and every
    /// event was consumed.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    /// Requests cooperative cancellation. The file being evaluated finishes first.
    pub fn cancel(&self) {
        tracing::info!(scan_id = %self.id, "Scan cancellation requested");
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `true` once the run has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to end and returns its persisted record.
    pub async fn wait(self) -> EngineResult<ScanRecord> {
        let record = self
            .task
            .await
            .map_err(|e| ScanError::internal(format!("scan task failed: {e}")))??;
        Ok(record)
    }
}
