//! Moves infected files into and out of the quarantine area.

use crate::audit::{emit_quarantine_event, QuarantineOperation};
use crate::core::error::{QuarantineError, QuarantineResult};
use crate::core::FileHasher;
use crate::quarantine::record::{NewQuarantineEntry, QuarantineEntry, QuarantineId};
use crate::store::Store;

use chrono::Utc;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Outcome of [`QuarantineManager::purge_all`].
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Entries whose file was deleted and whose entry was removed.
    pub purged: Vec<QuarantineId>,
    /// Entries that could not be purged cleanly.
    pub failed: Vec<QuarantineError>,
}

impl PurgeReport {
    /// Returns `true` if every entry was purged without error.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of entries that no longer exist in the store.
    pub fn removed_count(&self) -> usize {
        self.purged.len()
            + self
                .failed
                .iter()
                .filter(|e| matches!(e, QuarantineError::Purge { entry_removed: true, .. }))
                .count()
    }
}

/// Owns the quarantine area.
///
/// Files are moved with a same-volume rename, so the quarantine area must
/// live on the same filesystem as the files it receives. Every operation
/// keeps the area and the store consistent: a file is in the area exactly
/// when an active entry points at it.
#[derive(Debug)]
pub struct QuarantineManager {
    area: PathBuf,
    store: Arc<Store>,
    hasher: FileHasher,
    lock: Mutex<()>,
}

impl QuarantineManager {
    /// Creates a manager for `area`, creating the directory if needed.
    pub fn new(area: impl Into<PathBuf>, store: Arc<Store>, hasher: FileHasher) -> QuarantineResult<Self> {
        let area = area.into();
        fs::create_dir_all(&area)
            .map_err(|e| QuarantineError::isolation(&area, format!("cannot create quarantine area: {e}")))?;
        // stored paths must not depend on the working directory
        let area = fs::canonicalize(&area)
            .map_err(|e| QuarantineError::isolation(&area, format!("cannot resolve quarantine area: {e}")))?;

        tracing::debug!(area = %area.display(), "Quarantine area ready");
        Ok(Self {
            area,
            store,
            hasher,
            lock: Mutex::new(()),
        })
    }

    /// Absolute path of the quarantine area.
    pub fn area(&self) -> &Path {
        &self.area
    }

    /// Moves `path` into the quarantine area and records an entry.
    ///
    /// On failure the file stays where it was and no entry is written.
    pub fn isolate(&self, path: &Path, threat_label: &str) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let path = absolute(path).map_err(|e| QuarantineError::isolation(path, e))?;
        let path = path.as_path();

        let meta = fs::symlink_metadata(path).map_err(|e| QuarantineError::isolation(path, e))?;
        if !meta.is_file() {
            return Err(QuarantineError::isolation(path, "not a regular file"));
        }

        let hash = self
            .hasher
            .hash_file(path)
            .map_err(|e| QuarantineError::isolation(path, e))?;

        let destination = self.allocate_name(path)?;
        fs::rename(path, &destination).map_err(|e| QuarantineError::isolation(path, e))?;

        let new_entry = NewQuarantineEntry {
            original_path: path.to_path_buf(),
            quarantined_path: destination.clone(),
            content_hash: hash.primary().to_string(),
            threat_label: threat_label.to_string(),
            quarantined_at: Utc::now(),
        };

        let entry = match self.store.insert_quarantine_entry(new_entry) {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(rollback) = fs::rename(&destination, path) {
                    tracing::error!(
                        path = %path.display(),
                        quarantined = %destination.display(),
                        error = %rollback,
                        "Failed to move file back after store error"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            id = %entry.id,
            path = %path.display(),
            threat = %threat_label,
            "File isolated"
        );
        emit_quarantine_event(&entry, QuarantineOperation::Isolate);
        Ok(entry)
    }

    /// Moves an entry's file back to its original location and removes the entry.
    ///
    /// Refuses to overwrite an existing file at the original location.
    pub fn restore(&self, id: QuarantineId) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = self.active_entry(id)?;
        let target = entry.original_path.clone();
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| QuarantineError::restore(id.get(), e))?;
        }
        self.restore_locked(entry, target)
    }

    /// Moves an entry's file into `destination_dir`, under its original
    /// file name, and removes the entry.
    ///
    /// `destination_dir` must be an existing directory.
    pub fn restore_to(&self, id: QuarantineId, destination_dir: &Path) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = self.active_entry(id)?;

        if !destination_dir.is_dir() {
            return Err(QuarantineError::restore(
                id.get(),
                format!("not a directory: {}", destination_dir.display()),
            ));
        }
        let name = entry
            .original_file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| QuarantineError::restore(id.get(), "original path has no file name"))?;
        let target = destination_dir.join(name);
        self.restore_locked(entry, target)
    }

    fn restore_locked(&self, entry: QuarantineEntry, target: PathBuf) -> QuarantineResult<QuarantineEntry> {
        let id = entry.id;
        move_no_replace(&entry.quarantined_path, &target).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                QuarantineError::restore(
                    id.get(),
                    format!("destination already exists: {}", target.display()),
                )
            } else {
                QuarantineError::restore(id.get(), e)
            }
        })?;

        if let Err(e) = self.store.delete_quarantine_entry(id) {
            if let Err(rollback) = fs::rename(&target, &entry.quarantined_path) {
                tracing::error!(
                    id = %id,
                    error = %rollback,
                    "Failed to move file back into quarantine after store error"
                );
            }
            return Err(e.into());
        }

        tracing::info!(id = %id, path = %target.display(), "File restored");
        emit_quarantine_event(&entry, QuarantineOperation::Restore);
        Ok(QuarantineEntry {
            original_path: target,
            ..entry
        })
    }

    /// Deletes an entry's file and removes the entry.
    ///
    /// A file that has already vanished still has its entry removed; the
    /// call then fails with `Purge { entry_removed: true, .. }`.
    pub fn purge(&self, id: QuarantineId) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.purge_locked(id)
    }

    /// Purges every active entry, continuing past individual failures.
    pub fn purge_all(&self) -> QuarantineResult<PurgeReport> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut report = PurgeReport::default();
        for entry in self.store.list_quarantine_entries()? {
            match self.purge_locked(entry.id) {
                Ok(entry) => report.purged.push(entry.id),
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "Purge failed");
                    report.failed.push(e);
                }
            }
        }

        tracing::info!(
            purged = report.purged.len(),
            failed = report.failed.len(),
            "Purged quarantine"
        );
        Ok(report)
    }

    /// Returns every active entry, most recent first.
    pub fn list_active(&self) -> QuarantineResult<Vec<QuarantineEntry>> {
        Ok(self.store.list_quarantine_entries()?)
    }

    fn purge_locked(&self, id: QuarantineId) -> QuarantineResult<QuarantineEntry> {
        let entry = self.active_entry(id)?;
        let purge_err = |reason: String, entry_removed: bool| QuarantineError::Purge {
            id: id.get(),
            reason,
            entry_removed,
        };

        // Park the file under a name no entry uses, so a failed store delete
        // can put it back.
        let mut tombstone = self.area.join(format!(".purging-{}", id.get()));
        let mut n: u32 = 0;
        while fs::symlink_metadata(&tombstone).is_ok() {
            n += 1;
            tombstone = self.area.join(format!(".purging-{}-{n}", id.get()));
        }
        match fs::rename(&entry.quarantined_path, &tombstone) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.store.delete_quarantine_entry(id)?;
                tracing::warn!(
                    id = %id,
                    path = %entry.quarantined_path.display(),
                    "Quarantined file was already missing, entry removed"
                );
                emit_quarantine_event(&entry, QuarantineOperation::Purge);
                return Err(purge_err("quarantined file was already missing".to_string(), true));
            }
            Err(e) => return Err(purge_err(e.to_string(), false)),
        }

        if let Err(e) = self.store.delete_quarantine_entry(id) {
            if let Err(rollback) = fs::rename(&tombstone, &entry.quarantined_path) {
                tracing::error!(
                    id = %id,
                    error = %rollback,
                    "Failed to move file back after store error"
                );
            }
            return Err(e.into());
        }
        emit_quarantine_event(&entry, QuarantineOperation::Purge);

        if let Err(e) = fs::remove_file(&tombstone) {
            tracing::error!(
                id = %id,
                path = %tombstone.display(),
                error = %e,
                "Entry removed but file could not be deleted"
            );
            return Err(purge_err(e.to_string(), true));
        }

        tracing::info!(id = %id, "Quarantined file purged");
        Ok(entry)
    }

    fn active_entry(&self, id: QuarantineId) -> QuarantineResult<QuarantineEntry> {
        self.store
            .get_quarantine_entry(id)?
            .ok_or(QuarantineError::NotFound { id: id.get() })
    }

    /// Picks `name`, then `name (1)`, `name (2)`, ... until a free slot is found.
    fn allocate_name(&self, original: &Path) -> QuarantineResult<PathBuf> {
        let file_name = original
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("quarantined"));

        let stem = Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = Path::new(&file_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());

        let mut candidate = self.area.join(&file_name);
        let mut n: u32 = 0;
        while fs::symlink_metadata(&candidate).is_ok()
            || self.store.quarantined_path_in_use(&candidate)?
        {
            n += 1;
            let name = match &extension {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            candidate = self.area.join(name);
        }
        Ok(candidate)
    }
}

/// Resolves `path` against the working directory without touching the filesystem.
fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Moves `from` to `to`, failing with `AlreadyExists` instead of replacing `to`.
///
/// A hard link claims the destination atomically. Filesystems without hard
/// links fall back to a checked rename, which can still race with a file
/// created between the check and the rename.
fn move_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            if fs::symlink_metadata(to).is_ok() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", to.display()),
                ));
            }
            fs::rename(from, to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        files: PathBuf,
        manager: QuarantineManager,
        store: Arc<Store>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        fs::create_dir_all(&files).unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let manager =
            QuarantineManager::new(dir.path().join("quarantine"), store.clone(), FileHasher::new())
                .unwrap();
        Fixture {
            _dir: dir,
            files,
            manager,
            store,
        }
    }

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_isolate_moves_file_and_records_entry() {
        let fx = fixture();
        let path = write(&fx.files, "bad.exe", b"payload");

        let entry = fx.manager.isolate(&path, "Trojan.X").unwrap();
        assert!(!path.exists());
        assert!(entry.quarantined_path.starts_with(fx.manager.area()));
        assert_eq!(fs::read(&entry.quarantined_path).unwrap(), b"payload");
        assert_eq!(entry.content_hash, FileHasher::new().hash_bytes(b"payload").md5);
        assert_eq!(fx.manager.list_active().unwrap().len(), 1);
    }

    #[test]
    fn test_isolate_missing_file_writes_no_entry() {
        let fx = fixture();
        let err = fx
            .manager
            .isolate(&fx.files.join("nope.exe"), "X")
            .unwrap_err();
        assert!(matches!(err, QuarantineError::Isolation { .. }));
        assert!(fx.manager.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_colliding_names_are_suffixed() {
        let fx = fixture();
        let a = fx.files.join("a");
        let b = fx.files.join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        let first = fx.manager.isolate(&write(&a, "x.exe", b"1"), "X").unwrap();
        let second = fx.manager.isolate(&write(&b, "x.exe", b"2"), "X").unwrap();
        let third = fx.manager.isolate(&write(&a, "x.exe", b"3"), "X").unwrap();

        assert_eq!(first.quarantined_path.file_name().unwrap(), "x.exe");
        assert_eq!(second.quarantined_path.file_name().unwrap(), "x (1).exe");
        assert_eq!(third.quarantined_path.file_name().unwrap(), "x (2).exe");
    }

    #[test]
    fn test_restore_round_trip() {
        let fx = fixture();
        let path = write(&fx.files, "doc.pdf", b"original bytes");

        let entry = fx.manager.isolate(&path, "X").unwrap();
        let restored = fx.manager.restore(entry.id).unwrap();

        assert_eq!(restored.original_path, path);
        assert_eq!(fs::read(&path).unwrap(), b"original bytes");
        assert!(!entry.quarantined_path.exists());
        assert!(fx.store.get_quarantine_entry(entry.id).unwrap().is_none());
    }

    #[test]
    fn test_restore_refuses_to_overwrite() {
        let fx = fixture();
        let path = write(&fx.files, "doc.pdf", b"quarantined");
        let entry = fx.manager.isolate(&path, "X").unwrap();
        write(&fx.files, "doc.pdf", b"new file");

        let err = fx.manager.restore(entry.id).unwrap_err();
        assert!(matches!(err, QuarantineError::Restore { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"new file");
        assert!(entry.quarantined_path.exists());
        assert_eq!(fx.manager.list_active().unwrap().len(), 1);
    }

    #[test]
    fn test_restore_to_directory() {
        let fx = fixture();
        let path = write(&fx.files, "doc.pdf", b"bytes");
        let entry = fx.manager.isolate(&path, "X").unwrap();

        let dest = fx.files.join("restored");
        let err = fx.manager.restore_to(entry.id, &dest).unwrap_err();
        assert!(matches!(err, QuarantineError::Restore { .. }));
        assert_eq!(fx.manager.list_active().unwrap().len(), 1);

        fs::create_dir_all(&dest).unwrap();
        let restored = fx.manager.restore_to(entry.id, &dest).unwrap();
        assert_eq!(restored.original_path, dest.join("doc.pdf"));
        assert_eq!(fs::read(dest.join("doc.pdf")).unwrap(), b"bytes");
        assert!(fx.manager.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_restore_unknown_id() {
        let fx = fixture();
        let err = fx.manager.restore(QuarantineId(99)).unwrap_err();
        assert!(matches!(err, QuarantineError::NotFound { id: 99 }));
    }

    #[test]
    fn test_purge_deletes_file_and_entry() {
        let fx = fixture();
        let entry = fx
            .manager
            .isolate(&write(&fx.files, "a.exe", b"x"), "X")
            .unwrap();
        fx.manager.purge(entry.id).unwrap();
        assert!(!entry.quarantined_path.exists());
        assert!(fx.manager.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_purge_missing_file_still_removes_entry() {
        let fx = fixture();
        let entry = fx
            .manager
            .isolate(&write(&fx.files, "a.exe", b"x"), "X")
            .unwrap();
        fs::remove_file(&entry.quarantined_path).unwrap();

        let err = fx.manager.purge(entry.id).unwrap_err();
        assert!(matches!(
            err,
            QuarantineError::Purge {
                entry_removed: true,
                ..
            }
        ));
        assert!(fx.manager.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_purge_all_empties_area() {
        let fx = fixture();
        for name in ["a.exe", "b.doc", "c.zip"] {
            fx.manager
                .isolate(&write(&fx.files, name, name.as_bytes()), "X")
                .unwrap();
        }

        let report = fx.manager.purge_all().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.purged.len(), 3);
        assert_eq!(report.removed_count(), 3);
        assert!(fx.manager.list_active().unwrap().is_empty());
        assert_eq!(fs::read_dir(fx.manager.area()).unwrap().count(), 0);
    }

    #[test]
    fn test_relative_area_stores_absolute_paths() {
        let scratch = tempfile::Builder::new()
            .prefix("scanward-rel")
            .tempdir_in(".")
            .unwrap();
        let rel = scratch.path().to_path_buf();
        assert!(rel.is_relative());

        let store = Arc::new(Store::open_in_memory().unwrap());
        let manager =
            QuarantineManager::new(rel.join("quarantine"), store.clone(), FileHasher::new()).unwrap();
        assert!(manager.area().is_absolute());

        let path = write(&rel, "x.exe", b"payload");
        let entry = manager.isolate(&path, "EICAR").unwrap();
        assert!(entry.quarantined_path.is_absolute());
        assert!(entry.original_path.is_absolute());

        let stored = store.get_quarantine_entry(entry.id).unwrap().unwrap();
        assert!(stored.quarantined_path.is_absolute());
        assert!(stored.quarantined_path.exists());

        manager.purge(entry.id).unwrap();
        assert_eq!(fs::read_dir(manager.area()).unwrap().count(), 0);
    }

    fn pin_entries(store: &Store) {
        store
            .with_conn(|conn| {
                Ok(conn.execute_batch(
                    "CREATE TRIGGER pin_quarantine BEFORE DELETE ON quarantine
                     BEGIN SELECT RAISE(ABORT, 'pinned'); END;",
                )?)
            })
            .unwrap();
    }

    #[test]
    fn test_purge_keeps_file_when_store_delete_fails() {
        let fx = fixture();
        let entry = fx
            .manager
            .isolate(&write(&fx.files, "a.exe", b"keep me"), "X")
            .unwrap();
        pin_entries(&fx.store);

        let err = fx.manager.purge(entry.id).unwrap_err();
        assert!(matches!(err, QuarantineError::Store(_)));
        assert_eq!(fs::read(&entry.quarantined_path).unwrap(), b"keep me");
        assert_eq!(fx.manager.list_active().unwrap().len(), 1);
        // no parked copy left behind
        assert_eq!(fs::read_dir(fx.manager.area()).unwrap().count(), 1);
    }

    #[test]
    fn test_restore_rolls_back_when_store_delete_fails() {
        let fx = fixture();
        let path = write(&fx.files, "doc.pdf", b"bytes");
        let entry = fx.manager.isolate(&path, "X").unwrap();
        pin_entries(&fx.store);

        let err = fx.manager.restore(entry.id).unwrap_err();
        assert!(matches!(err, QuarantineError::Store(_)));
        assert!(!path.exists());
        assert_eq!(fs::read(&entry.quarantined_path).unwrap(), b"bytes");
        assert_eq!(fx.manager.list_active().unwrap().len(), 1);
    }

    #[test]
    fn test_move_no_replace_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = write(dir.path(), "from.bin", b"source");
        let to = write(dir.path(), "to.bin", b"destination");

        let err = move_no_replace(&from, &to).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&from).unwrap(), b"source");
        assert_eq!(fs::read(&to).unwrap(), b"destination");

        let fresh = dir.path().join("fresh.bin");
        move_no_replace(&from, &fresh).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&fresh).unwrap(), b"source");
    }
}
