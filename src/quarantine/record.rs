//! Quarantine entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Store-assigned identifier of a quarantine entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarantineId(pub i64);

impl QuarantineId {
    /// Returns the raw id.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for QuarantineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for QuarantineId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a quarantine entry.
///
/// Only `Active` entries exist in the store; `Restored` and `Purged` are
/// terminal and are reached by deleting the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuarantineState {
    /// The file sits in the quarantine area.
    Active,
    /// The file was moved back out.
    Restored,
    /// The file was deleted.
    Purged,
}

impl QuarantineState {
    /// Returns `true` for `Restored` and `Purged`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Metadata about an isolated file.
///
/// `quarantined_path` always names an existing file inside the quarantine
/// area for as long as the entry exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Store-assigned id.
    pub id: QuarantineId,
    /// Where the file lived before isolation.
    pub original_path: PathBuf,
    /// Where the file lives now, inside the quarantine area.
    pub quarantined_path: PathBuf,
    /// MD5 digest of the content at isolation time.
    pub content_hash: String,
    /// Threat label that triggered isolation.
    pub threat_label: String,
    /// When the file was isolated.
    pub quarantined_at: DateTime<Utc>,
}

impl QuarantineEntry {
    /// The original file name, used when restoring.
    pub fn original_file_name(&self) -> Option<&std::ffi::OsStr> {
        self.original_path.file_name()
    }

    /// Size of the quarantined file, or `None` if it cannot be read.
    pub fn file_size(&self) -> Option<u64> {
        std::fs::metadata(&self.quarantined_path).ok().map(|m| m.len())
    }
}

/// A quarantine entry that has not yet been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuarantineEntry {
    /// Where the file lived before isolation.
    pub original_path: PathBuf,
    /// Where the file lives now.
    pub quarantined_path: PathBuf,
    /// MD5 digest of the content.
    pub content_hash: String,
    /// Threat label.
    pub threat_label: String,
    /// When the file was isolated.
    pub quarantined_at: DateTime<Utc>,
}

impl NewQuarantineEntry {
    /// Attaches the store-assigned id.
    pub fn into_entry(self, id: i64) -> QuarantineEntry {
        QuarantineEntry {
            id: QuarantineId(id),
            original_path: self.original_path,
            quarantined_path: self.quarantined_path,
            content_hash: self.content_hash,
            threat_label: self.threat_label,
            quarantined_at: self.quarantined_at,
        }
    }
}
