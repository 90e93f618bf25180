//! Per-file verdicts and per-run scan records.
//!
//! A [`ScanVerdict`] is produced once per file per pass and is never
//! persisted. A [`ScanRecord`] summarises a whole run and is appended to the
//! history log by the store.

use crate::core::types::{DetectionMethod, ScanKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The infected/clean decision for one file from one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanVerdict {
    /// Path of the evaluated file.
    pub path: PathBuf,
    /// Whether any detector flagged the file.
    pub infected: bool,
    /// Threat label when infected.
    pub threat_label: Option<String>,
    /// Which detectors produced this verdict.
    pub method: DetectionMethod,
    /// Cloud was requested for this file but did not answer.
    #[serde(default)]
    pub cloud_unavailable: bool,
}

impl ScanVerdict {
    /// Returns `true` if the file is infected.
    pub fn is_infected(&self) -> bool {
        self.infected
    }

    /// Returns the threat label, or `"None"` for clean files.
    pub fn label_or_none(&self) -> &str {
        self.threat_label.as_deref().unwrap_or("None")
    }
}

/// Running counters for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTally {
    /// Candidates evaluated, including unscannable ones.
    pub files_scanned: u64,
    /// Files with an infected verdict.
    pub threats_found: u64,
    /// Infected files that were isolated during the run.
    pub threats_removed: u64,
    /// Files whose content could not be read.
    pub files_unscannable: u64,
    /// Directories skipped because they could not be listed.
    pub dirs_skipped: u64,
    /// Files for which the cloud verdict was unavailable.
    pub cloud_unavailable: u64,
}

impl ScanTally {
    /// Builds the human-readable detail note stored with the record.
    pub fn detail_note(&self, completed: bool) -> String {
        let mut parts = Vec::new();
        if !completed {
            parts.push("cancelled".to_string());
        }
        if self.files_unscannable > 0 {
            parts.push(format!("{} unscannable", self.files_unscannable));
        }
        if self.dirs_skipped > 0 {
            parts.push(format!("{} directories skipped", self.dirs_skipped));
        }
        if self.cloud_unavailable > 0 {
            parts.push(format!("cloud unavailable for {} files", self.cloud_unavailable));
        }
        parts.join("; ")
    }
}

/// A scan record that has not yet been assigned an id by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScanRecord {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Kind of scan.
    pub kind: ScanKind,
    /// Aggregate counts.
    pub tally: ScanTally,
    /// `false` when the run was cancelled.
    pub completed: bool,
    /// Free-form detail.
    pub detail_note: String,
}

impl NewScanRecord {
    /// Creates a record stamped with the current time.
    pub fn new(kind: ScanKind, tally: ScanTally, completed: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            tally,
            completed,
            detail_note: tally.detail_note(completed),
        }
    }

    /// Overrides the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// An immutable entry of the scan history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Store-assigned, monotonically increasing id.
    pub id: i64,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Kind of scan.
    pub kind: ScanKind,
    /// Candidates evaluated.
    pub files_scanned: u64,
    /// Infected verdicts.
    pub threats_found: u64,
    /// Infected files isolated during the run.
    pub threats_removed: u64,
    /// Files that could not be read.
    pub files_unscannable: u64,
    /// Directories skipped.
    pub dirs_skipped: u64,
    /// `false` when the run was cancelled before every candidate was evaluated.
    pub completed: bool,
    /// Free-form detail.
    pub detail_note: String,
}

impl ScanRecord {
    /// Builds a persisted record from its unpersisted form and assigned id.
    pub fn from_new(id: i64, record: &NewScanRecord) -> Self {
        Self {
            id,
            timestamp: record.timestamp,
            kind: record.kind,
            files_scanned: record.tally.files_scanned,
            threats_found: record.tally.threats_found,
            threats_removed: record.tally.threats_removed,
            files_unscannable: record.tally.files_unscannable,
            dirs_skipped: record.tally.dirs_skipped,
            completed: record.completed,
            detail_note: record.detail_note.clone(),
        }
    }
}
