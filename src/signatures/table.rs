//! The in-memory signature table.

use crate::core::error::SignatureError;
use crate::core::FileHash;
use crate::signatures::source::{builtin_signatures, read_signature_file, Signature};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An immutable digest-to-label mapping.
///
/// Scans hold one snapshot for their whole run, so a concurrent reload never
/// changes the table under a running scan.
#[derive(Debug, Default)]
pub struct SignatureTable {
    entries: HashMap<String, String>,
}

impl SignatureTable {
    /// Builds a table; later duplicates overwrite earlier ones.
    pub fn from_signatures(signatures: impl IntoIterator<Item = Signature>) -> Self {
        let mut entries = HashMap::new();
        for sig in signatures {
            entries.insert(sig.digest, sig.label);
        }
        Self { entries }
    }

    /// Looks up a single digest (case-insensitive).
    pub fn lookup(&self, digest: &str) -> Option<&str> {
        match self.entries.get(digest) {
            Some(label) => Some(label.as_str()),
            None => self
                .entries
                .get(&digest.to_ascii_lowercase())
                .map(String::as_str),
        }
    }

    /// Looks up a file's digests, primary first.
    pub fn lookup_hash(&self, hash: &FileHash) -> Option<&str> {
        hash.digests().into_iter().find_map(|d| self.lookup(d))
    }

    /// Number of signatures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no signatures.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide signature store with atomic reload.
///
/// Readers either see the old table or the new one, never a mix.
#[derive(Debug)]
pub struct SignatureStore {
    table: RwLock<Arc<SignatureTable>>,
    source: Option<PathBuf>,
    generation: AtomicU64,
}

impl SignatureStore {
    /// Creates a store holding exactly the given signatures.
    pub fn from_signatures(signatures: impl IntoIterator<Item = Signature>) -> Self {
        Self {
            table: RwLock::new(Arc::new(SignatureTable::from_signatures(signatures))),
            source: None,
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a store holding only the built-in signatures.
    pub fn builtin() -> Self {
        Self::from_signatures(builtin_signatures())
    }

    /// Creates an empty store. Valid, if not very useful.
    pub fn empty() -> Self {
        Self::from_signatures(Vec::new())
    }

    /// Creates a store from the built-ins plus the given file.
    ///
    /// The file is remembered as the source for [`reload_from_source`](Self::reload_from_source).
    pub fn load_file(path: impl Into<PathBuf>) -> Result<Self, SignatureError> {
        let path = path.into();
        let mut signatures = builtin_signatures();
        signatures.extend(read_signature_file(&path)?);
        let mut store = Self::from_signatures(signatures);
        tracing::info!(path = %path.display(), count = store.len(), "Loaded signatures");
        store.source = Some(path);
        Ok(store)
    }

    /// Returns the current table.
    pub fn snapshot(&self) -> Arc<SignatureTable> {
        Arc::clone(
            &self
                .table
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Looks up a digest in the current table.
    pub fn lookup(&self, digest: &str) -> Option<String> {
        self.snapshot().lookup(digest).map(str::to_string)
    }

    /// Looks up a file's digests in the current table.
    pub fn lookup_hash(&self, hash: &FileHash) -> Option<String> {
        self.snapshot().lookup_hash(hash).map(str::to_string)
    }

    /// Replaces the whole table in one swap.
    pub fn reload(&self, signatures: impl IntoIterator<Item = Signature>) {
        let table = Arc::new(SignatureTable::from_signatures(signatures));
        let count = table.len();
        *self
            .table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = table;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        crate::audit::emit_signatures_reloaded(count, generation);
    }

    /// Re-reads the built-ins plus the given file and swaps them in.
    ///
    /// On error the current table is left untouched.
    pub fn reload_from_file(&self, path: &Path) -> Result<usize, SignatureError> {
        let mut signatures = builtin_signatures();
        signatures.extend(read_signature_file(path)?);
        self.reload(signatures);
        Ok(self.len())
    }

    /// Re-reads the file this store was loaded from.
    pub fn reload_from_source(&self) -> Result<usize, SignatureError> {
        let path = self.source.as_deref().ok_or(SignatureError::NoSource)?;
        self.reload_from_file(path)
    }

    /// The file this store was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of swaps performed since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of signatures in the current table.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if the current table is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for SignatureStore {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FileHasher;

    fn sig(digest: &str, label: &str) -> Signature {
        Signature::new(digest, label).unwrap()
    }

    #[test]
    fn test_builtin_matches_empty_file() {
        let store = SignatureStore::builtin();
        let hash = FileHasher::new().hash_bytes(b"");
        assert_eq!(store.lookup_hash(&hash).as_deref(), Some("Empty File"));
        assert_eq!(
            store.lookup("D41D8CD98F00B204E9800998ECF8427E").as_deref(),
            Some("Empty File")
        );
    }

    #[test]
    fn test_empty_store_is_valid() {
        let store = SignatureStore::empty();
        assert!(store.is_empty());
        assert!(store.lookup("d41d8cd98f00b204e9800998ecf8427e").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let store = SignatureStore::from_signatures(vec![
            sig("44d88612fea8a8f36de82e1278abb02f", "First"),
            sig("44d88612fea8a8f36de82e1278abb02f", "Second"),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.lookup("44d88612fea8a8f36de82e1278abb02f").as_deref(),
            Some("Second")
        );
    }

    #[test]
    fn test_reload_swaps_atomically() {
        let store = SignatureStore::builtin();
        let before = store.snapshot();

        store.reload(vec![sig("44d88612fea8a8f36de82e1278abb02f", "EICAR")]);

        // The old snapshot is unchanged; new readers see only the new table.
        assert_eq!(before.len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.generation(), 1);
        assert!(store.lookup("d41d8cd98f00b204e9800998ecf8427e").is_none());
    }

    #[test]
    fn test_reload_from_source_requires_file() {
        let store = SignatureStore::builtin();
        assert!(matches!(
            store.reload_from_source(),
            Err(SignatureError::NoSource)
        ));
    }

    #[test]
    fn test_failed_reload_keeps_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feed.txt");
        std::fs::write(&path, "not a signature line\n").unwrap();

        let store = SignatureStore::builtin();
        assert!(store.reload_from_file(&path).is_err());
        assert_eq!(store.len(), 2);
        assert_eq!(store.generation(), 0);
    }
}
