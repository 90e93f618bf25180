//! Typed reads and writes over the three record kinds.
//!
//! Quarantine entries are deleted one at a time, each paired with its file
//! by the quarantine manager. Clearing the quarantine goes through
//! `QuarantineManager::purge_all`, not a bulk delete here.

use super::sqlite::Store;
use crate::core::error::{StoreError, StoreResult};
use crate::core::{NewScanRecord, ScanKind, ScanRecord};
use crate::quarantine::{NewQuarantineEntry, QuarantineEntry, QuarantineId};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

const SCAN_KINDS: [ScanKind; 3] = [ScanKind::Quick, ScanKind::Full, ScanKind::Custom];

/// Fixed-width RFC 3339 so that lexical order matches time order.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            reason: format!("bad timestamp '{raw}': {e}"),
        })
}

fn decode_kind(raw: &str) -> StoreResult<ScanKind> {
    SCAN_KINDS
        .into_iter()
        .find(|kind| kind.label() == raw)
        .or_else(|| raw.parse().ok())
        .ok_or_else(|| StoreError::Corrupt {
            reason: format!("unknown scan type '{raw}'"),
        })
}

fn to_count(value: i64, column: &str) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt {
        reason: format!("negative {column}: {value}"),
    })
}

fn to_sql_count(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Serialization {
        reason: format!("count {value} exceeds storage range"),
    })
}

struct RawScanRow {
    id: i64,
    timestamp: String,
    scan_type: String,
    files_scanned: i64,
    threats_found: i64,
    threats_removed: i64,
    files_unscannable: i64,
    dirs_skipped: i64,
    completed: bool,
    details: String,
}

impl RawScanRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            scan_type: row.get(2)?,
            files_scanned: row.get(3)?,
            threats_found: row.get(4)?,
            threats_removed: row.get(5)?,
            files_unscannable: row.get(6)?,
            dirs_skipped: row.get(7)?,
            completed: row.get(8)?,
            details: row.get(9)?,
        })
    }

    fn decode(self) -> StoreResult<ScanRecord> {
        Ok(ScanRecord {
            id: self.id,
            timestamp: decode_timestamp(&self.timestamp)?,
            kind: decode_kind(&self.scan_type)?,
            files_scanned: to_count(self.files_scanned, "files_scanned")?,
            threats_found: to_count(self.threats_found, "threats_found")?,
            threats_removed: to_count(self.threats_removed, "threats_removed")?,
            files_unscannable: to_count(self.files_unscannable, "files_unscannable")?,
            dirs_skipped: to_count(self.dirs_skipped, "dirs_skipped")?,
            completed: self.completed,
            detail_note: self.details,
        })
    }
}

struct RawQuarantineRow {
    id: i64,
    original_path: String,
    quarantined_path: String,
    file_hash: String,
    threat_name: String,
    quarantined_date: String,
}

impl RawQuarantineRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            original_path: row.get(1)?,
            quarantined_path: row.get(2)?,
            file_hash: row.get(3)?,
            threat_name: row.get(4)?,
            quarantined_date: row.get(5)?,
        })
    }

    fn decode(self) -> StoreResult<QuarantineEntry> {
        Ok(QuarantineEntry {
            id: QuarantineId(self.id),
            original_path: PathBuf::from(self.original_path),
            quarantined_path: PathBuf::from(self.quarantined_path),
            content_hash: self.file_hash,
            threat_label: self.threat_name,
            quarantined_at: decode_timestamp(&self.quarantined_date)?,
        })
    }
}

fn path_text(path: &std::path::Path) -> StoreResult<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| StoreError::Serialization {
            reason: format!("path is not valid UTF-8: {}", path.display()),
        })
}

const QUARANTINE_COLUMNS: &str =
    "id, original_path, quarantined_path, file_hash, threat_name, quarantined_date";

impl Store {
    // ── Scan history ─────────────────────────────────────────────

    /// Appends a scan record and returns it with its assigned id.
    pub fn append_scan_record(&self, record: &NewScanRecord) -> StoreResult<ScanRecord> {
        let tally = &record.tally;
        let values = [
            to_sql_count(tally.files_scanned)?,
            to_sql_count(tally.threats_found)?,
            to_sql_count(tally.threats_removed)?,
            to_sql_count(tally.files_unscannable)?,
            to_sql_count(tally.dirs_skipped)?,
        ];

        let id = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO scan_history (timestamp, scan_type, files_scanned, threats_found, \
                 threats_removed, files_unscannable, dirs_skipped, completed, details) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    encode_timestamp(&record.timestamp),
                    record.kind.label(),
                    values[0],
                    values[1],
                    values[2],
                    values[3],
                    values[4],
                    record.completed,
                    record.detail_note,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })?;

        debug!(id, kind = %record.kind, "Appended scan record");
        Ok(ScanRecord::from_new(id, record))
    }

    /// Returns every scan record, most recent first.
    pub fn list_scan_records(&self) -> StoreResult<Vec<ScanRecord>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, scan_type, files_scanned, threats_found, threats_removed, \
                 files_unscannable, dirs_skipped, completed, details \
                 FROM scan_history ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], RawScanRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        rows.into_iter().map(RawScanRow::decode).collect()
    }

    /// Deletes every scan record. Returns the number removed.
    pub fn clear_scan_history(&self) -> StoreResult<usize> {
        let removed = self.with_conn(|conn| Ok(conn.execute("DELETE FROM scan_history", [])?))?;
        debug!(removed, "Cleared scan history");
        Ok(removed)
    }

    // ── Quarantine ───────────────────────────────────────────────

    /// Inserts a quarantine entry and returns it with its assigned id.
    pub fn insert_quarantine_entry(&self, entry: NewQuarantineEntry) -> StoreResult<QuarantineEntry> {
        let original = path_text(&entry.original_path)?;
        let quarantined = path_text(&entry.quarantined_path)?;
        let id = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO quarantine (original_path, quarantined_path, file_hash, threat_name, \
                 quarantined_date) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    original,
                    quarantined,
                    entry.content_hash,
                    entry.threat_label,
                    encode_timestamp(&entry.quarantined_at),
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })?;
        Ok(entry.into_entry(id))
    }

    /// Fetches one quarantine entry.
    pub fn get_quarantine_entry(&self, id: QuarantineId) -> StoreResult<Option<QuarantineEntry>> {
        let raw = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {QUARANTINE_COLUMNS} FROM quarantine WHERE id = ?1"),
                    params![id.get()],
                    RawQuarantineRow::from_row,
                )
                .optional()?)
        })?;
        raw.map(RawQuarantineRow::decode).transpose()
    }

    /// Returns every quarantine entry, most recent first.
    pub fn list_quarantine_entries(&self) -> StoreResult<Vec<QuarantineEntry>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUARANTINE_COLUMNS} FROM quarantine \
                 ORDER BY quarantined_date DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], RawQuarantineRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        rows.into_iter().map(RawQuarantineRow::decode).collect()
    }

    /// Deletes a quarantine entry. Returns `false` if it did not exist.
    pub fn delete_quarantine_entry(&self, id: QuarantineId) -> StoreResult<bool> {
        let removed = self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM quarantine WHERE id = ?1", params![id.get()])?)
        })?;
        Ok(removed > 0)
    }

    /// Returns `true` if an entry already owns `path` inside the quarantine area.
    pub fn quarantined_path_in_use(&self, path: &std::path::Path) -> StoreResult<bool> {
        let text = path_text(path)?;
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM quarantine WHERE quarantined_path = ?1",
                    params![text],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Reads one setting.
    pub fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    /// Writes one setting, replacing any previous value.
    pub fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })?;
        debug!(key, value, "Setting stored");
        Ok(())
    }

    /// Returns every stored setting.
    pub fn all_settings(&self) -> StoreResult<BTreeMap<String, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
            let map = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
            Ok(map)
        })
    }
}
