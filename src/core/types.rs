//! Core types used throughout the engine.
//!
//! This module defines the fundamental data structures for representing
//! file fingerprints, scan kinds, detection methods and scan progress.

use crate::core::error::ScanResult;
use crate::core::hasher::FileHasher;

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Content fingerprints of a file, computed in a single streaming pass.
///
/// MD5 is the primary signature key; SHA-256 and BLAKE3 are carried so that
/// signature feeds in either format can be matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash {
    /// MD5 digest, lower-case hex.
    pub md5: String,
    /// SHA-256 digest, lower-case hex.
    pub sha256: String,
    /// BLAKE3 digest, lower-case hex.
    pub blake3: String,
}

impl FileHash {
    /// Returns every digest, primary first.
    pub fn digests(&self) -> [&str; 3] {
        [&self.md5, &self.sha256, &self.blake3]
    }

    /// Returns the primary digest (MD5).
    pub fn primary(&self) -> &str {
        &self.md5
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.md5)
    }
}

/// The kind of scan requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    /// Common user locations with a reduced extension set.
    Quick,
    /// Whole-system roots.
    Full,
    /// Caller-chosen roots.
    Custom,
}

impl ScanKind {
    /// Stable identifier used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Full => "full",
            Self::Custom => "custom",
        }
    }

    /// Human-readable label used in history exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quick => "Quick Scan",
            Self::Full => "Full Scan",
            Self::Custom => "Custom Scan",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "full" => Ok(Self::Full),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown scan kind '{other}'")),
        }
    }
}

/// Which detectors produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Local signature table only.
    Signature,
    /// Cloud verdict service only.
    Cloud,
    /// Both detectors contributed.
    Both,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => write!(f, "signature"),
            Self::Cloud => write!(f, "cloud"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// A file selected for evaluation, with a lazily computed digest.
///
/// Candidates are created per walk and dropped after evaluation.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    path: PathBuf,
    digest: OnceCell<FileHash>,
}

impl FileCandidate {
    /// Creates a candidate for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            digest: OnceCell::new(),
        }
    }

    /// Returns the candidate's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the digest if it has already been computed.
    pub fn cached_digest(&self) -> Option<&FileHash> {
        self.digest.get()
    }

    /// Returns the digest, computing it on first use.
    ///
    /// A failure is not cached; the next call retries.
    pub fn digest(&self, hasher: &FileHasher) -> ScanResult<&FileHash> {
        if self.digest.get().is_none() {
            let hash = hasher.hash_file(&self.path)?;
            let _ = self.digest.set(hash);
        }
        self.digest
            .get()
            .ok_or_else(|| crate::core::ScanError::internal("digest cell empty after set"))
    }

    /// Consumes the candidate, returning its path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Progress of a running scan: evaluated candidates out of the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Candidates evaluated so far (including unscannable ones).
    pub scanned: u64,
    /// Candidates found by enumeration.
    pub total: u64,
}

impl ScanProgress {
    /// Creates a progress value.
    pub fn new(scanned: u64, total: u64) -> Self {
        Self { scanned, total }
    }

    /// Fraction complete in `0.0..=1.0`; an empty run counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.scanned as f64 / self.total as f64
        }
    }

    /// Percentage complete, rounded down.
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).floor() as u8
    }

    /// Returns `true` once every candidate has been evaluated.
    pub fn is_done(&self) -> bool {
        self.scanned >= self.total
    }
}
