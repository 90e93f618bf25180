//! Candidate enumeration under the scan roots.

use crate::config::normalize_extension;
use crate::core::ScanError;
use crate::scanner::orchestrator::CancelFlag;

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of enumerating the scan roots.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Candidate files in walk order, without duplicates.
    pub candidates: Vec<PathBuf>,
    /// Roots and directories that could not be listed.
    pub skipped: Vec<ScanError>,
}

/// Lower-cased extension set used to select candidates.
///
/// An empty filter selects every regular file.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    extensions: HashSet<String>,
}

impl ExtensionFilter {
    /// Builds a filter from extensions with or without leading dots.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    /// Returns `true` if `path` should be scanned.
    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&normalize_extension(ext)),
            None => false,
        }
    }
}

/// Walks `roots` recursively and collects regular files accepted by `filter`.
///
/// Symlinks are not followed. Unreadable directories and missing roots are
/// recorded in [`Enumeration::skipped`] and the walk continues. Stops early
/// if `cancel` is raised.
pub fn enumerate(roots: &[PathBuf], filter: &ExtensionFilter, cancel: &CancelFlag) -> Enumeration {
    let mut out = Enumeration::default();
    let mut seen = HashSet::new();

    for root in roots {
        if cancel.is_cancelled() {
            break;
        }
        if !root.exists() {
            warn!(root = %root.display(), "Scan root does not exist, skipping");
            out.skipped
                .push(ScanError::directory_access(root, "root does not exist"));
            continue;
        }

        for entry in WalkDir::new(root).follow_links(false) {
            if cancel.is_cancelled() {
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root.as_path()).to_path_buf();
                    let reason = err
                        .io_error()
                        .map(io::Error::to_string)
                        .unwrap_or_else(|| err.to_string());
                    warn!(path = %path.display(), %reason, "Skipping unreadable directory");
                    out.skipped.push(ScanError::directory_access(path, reason));
                    continue;
                }
            };

            if !entry.file_type().is_file() || !filter.matches(entry.path()) {
                continue;
            }
            let path = entry.into_path();
            if seen.insert(path.clone()) {
                out.candidates.push(path);
            }
        }
    }

    debug!(
        candidates = out.candidates.len(),
        skipped = out.skipped.len(),
        "Enumeration finished"
    );
    out
}
