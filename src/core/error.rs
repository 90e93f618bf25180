//! Error types for the scanward engine.
//!
//! This module provides structured, typed errors for all failure scenarios.
//! The engine never panics, and no error is ever translated into a clean
//! verdict: per-file failures become "unscannable", cloud failures become
//! "cloud verdict unavailable", and everything else is surfaced to the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while enumerating or evaluating files during a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A file could not be opened or read to completion.
    ///
    /// The file is reported as unscannable, never as clean.
    #[error("unreadable file {path}: {reason}")]
    UnreadableFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// A directory could not be listed; its subtree is skipped.
    #[error("cannot access directory {path}: {reason}")]
    DirectoryAccess {
        /// Path of the directory.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// Another scan is already running in this process.
    #[error("a scan is already in progress")]
    ScanInProgress,

    /// The scan was cancelled.
    #[error("scan was cancelled")]
    Cancelled,

    /// The scan request or engine configuration is invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// Persisting the scan record failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error occurred outside of per-file evaluation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Creates an `UnreadableFile` error.
    pub fn unreadable(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::UnreadableFile {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `DirectoryAccess` error.
    pub fn directory_access(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::DirectoryAccess {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error only affects a single file or subtree
    /// and the surrounding scan should continue.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::UnreadableFile { .. } | Self::DirectoryAccess { .. }
        )
    }
}

/// The failure kinds of the external cloud verdict service.
///
/// The engine handles all of them identically: the cloud verdict is treated
/// as unavailable and the signature result stands alone.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The service rejected our credentials.
    #[error("authentication failed for cloud service '{service}': {reason}")]
    Authentication {
        /// Name of the service.
        service: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The service could not be reached or returned a transport error.
    #[error("network error talking to cloud service '{service}': {message}")]
    Network {
        /// Name of the service.
        service: String,
        /// Error message.
        message: String,
    },

    /// The submission did not finish within the configured bound.
    #[error("cloud service '{service}' timed out after {elapsed:?}")]
    Timeout {
        /// Name of the service.
        service: String,
        /// How long the submission ran before it was abandoned.
        elapsed: Duration,
    },
}

/// Discriminant of a [`CloudError`], convenient for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    /// See [`CloudError::Authentication`].
    Authentication,
    /// See [`CloudError::Network`].
    Network,
    /// See [`CloudError::Timeout`].
    Timeout,
}

impl CloudError {
    /// Creates an `Authentication` error.
    pub fn authentication(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Network` error.
    pub fn network(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(service: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            service: service.into(),
            elapsed,
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> CloudErrorKind {
        match self {
            Self::Authentication { .. } => CloudErrorKind::Authentication,
            Self::Network { .. } => CloudErrorKind::Network,
            Self::Timeout { .. } => CloudErrorKind::Timeout,
        }
    }

    /// Returns the service name.
    pub fn service(&self) -> &str {
        match self {
            Self::Authentication { service, .. }
            | Self::Network { service, .. }
            | Self::Timeout { service, .. } => service,
        }
    }

    /// Returns `true` if a later submission might succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Error type for quarantine operations.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// The file could not be moved into the quarantine area.
    ///
    /// No entry is written when this is returned.
    #[error("failed to isolate {path}: {reason}")]
    Isolation {
        /// Path of the file that was to be isolated.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// The file could not be moved back out of quarantine.
    ///
    /// The entry stays active when this is returned.
    #[error("failed to restore quarantine entry {id}: {reason}")]
    Restore {
        /// The entry that was to be restored.
        id: i64,
        /// Reason for the failure.
        reason: String,
    },

    /// The quarantined file could not be deleted.
    #[error("failed to purge quarantine entry {id}: {reason}")]
    Purge {
        /// The entry that was to be purged.
        id: i64,
        /// Reason for the failure.
        reason: String,
        /// Whether the entry was removed from the store regardless.
        entry_removed: bool,
    },

    /// No active entry exists with this id.
    #[error("quarantine entry not found: {id}")]
    NotFound {
        /// The id that was not found.
        id: i64,
    },

    /// The store rejected the operation.
    #[error("quarantine store error: {0}")]
    Store(#[from] StoreError),
}

impl QuarantineError {
    /// Creates an `Isolation` error.
    pub fn isolation(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::Isolation {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Restore` error.
    pub fn restore(id: i64, reason: impl ToString) -> Self {
        Self::Restore {
            id,
            reason: reason.to_string(),
        }
    }

    /// Returns the entry id this error refers to, if any.
    pub fn entry_id(&self) -> Option<i64> {
        match self {
            Self::Restore { id, .. } | Self::Purge { id, .. } | Self::NotFound { id } => Some(*id),
            _ => None,
        }
    }
}

/// Error type for the persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized for storage.
    #[error("serialization failed: {reason}")]
    Serialization {
        /// Reason for the failure.
        reason: String,
    },

    /// A stored row could not be decoded.
    #[error("corrupt row: {reason}")]
    Corrupt {
        /// Reason for the failure.
        reason: String,
    },

    /// The store was shut down.
    #[error("store is closed")]
    Closed,
}

/// Error type for signature loading.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The signature source could not be read.
    #[error("I/O error reading signatures: {0}")]
    Io(#[from] std::io::Error),

    /// The signature source is malformed.
    #[error("malformed signature source: {reason}")]
    Parse {
        /// Reason for the failure.
        reason: String,
    },

    /// A digest is not lower- or upper-case hex of a supported length.
    #[error("invalid digest '{digest}'")]
    InvalidDigest {
        /// The offending digest.
        digest: String,
    },

    /// No signature file is configured.
    #[error("no signature file configured")]
    NoSource,
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error reading configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value.
    #[error("invalid configuration field '{field}': {reason}")]
    Invalid {
        /// Name of the field.
        field: &'static str,
        /// Reason it was rejected.
        reason: String,
    },
}

/// Top-level error returned by the [`Engine`](crate::engine::Engine) facade.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A scan-level failure.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A quarantine failure.
    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    /// A store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A signature loading failure.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// A configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Export formatting failed.
    #[error("export failed: {reason}")]
    Export {
        /// Reason for the failure.
        reason: String,
    },
}

/// A specialized `Result` type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// A specialized `Result` type for quarantine operations.
pub type QuarantineResult<T> = Result<T, QuarantineError>;

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A specialized `Result` type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
