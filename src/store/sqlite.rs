//! Connection setup, pragmas and schema versioning.

use crate::core::error::{StoreError, StoreResult};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Schema version written by `schema.sql`.
pub const SCHEMA_VERSION: i64 = 1;

/// Durable, crash-consistent storage for scan history, quarantine entries
/// and settings.
///
/// Every mutation is a single SQLite transaction committed with
/// `synchronous = FULL`, so an acknowledged write survives a crash. The
/// connection is serialized behind a mutex; the store is shared across the
/// engine as an `Arc<Store>`.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl Store {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "Opened scanward database");
        Ok(store)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        configure_pragmas(&conn)?;
        migrate_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path,
        })
    }

    /// Location of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Closes the connection. Later operations fail with [`StoreError::Closed`].
    pub fn close(&self) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(conn) = conn {
            if let Err(e) = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())) {
                debug!(error = %e, "WAL checkpoint skipped");
            }
            conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
            debug!("Database connection closed");
        }
        Ok(())
    }

    /// Runs `f` with exclusive access to the open connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        f(conn)
    }
}

fn configure_pragmas(conn: &Connection) -> StoreResult<()> {
    // journal_mode returns a row, so it cannot go through execute_batch on
    // every SQLite build.
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.execute_batch(
        "PRAGMA synchronous = FULL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    debug!("SQLite pragmas configured (WAL mode, synchronous=FULL)");
    Ok(())
}

fn migrate_schema(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(StoreError::Corrupt {
            reason: format!(
                "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
            ),
        });
    }

    conn.execute_batch(include_str!("schema.sql"))?;
    debug!(from = version, to = SCHEMA_VERSION, "SQLite schema initialized");
    Ok(())
}
