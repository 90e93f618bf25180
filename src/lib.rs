//! # Scanward
//!
//! A local malware-scanning engine: content fingerprinting, signature
//! matching, optional cloud verdicts, a quarantine lifecycle and a durable
//! scan history.
//!
//! ## Overview
//!
//! Scanward walks a set of roots, selects files by extension and decides
//! for each one whether it is infected:
//!
//! - Fingerprint the content (MD5, SHA-256 and BLAKE3 in one streaming pass)
//! - Look the digests up in an atomically reloadable signature table
//! - Optionally ask a cloud verdict service, bounded by a timeout
//! - Combine both answers; a failure never becomes a "clean" verdict
//! - Isolate infected files into a quarantine area, restore or purge them
//! - Persist one record per run in a SQLite history log and export it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanward::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EngineError> {
//!     let engine = Engine::open(EngineConfig::in_dir("./scanward-data"))?;
//!
//!     let handle = engine.start_scan(
//!         ScanKind::Custom,
//!         ScanParams::new().with_roots(["./downloads"]),
//!     )?;
//!     let record = handle.wait().await?;
//!     println!("{} threats in {} files", record.threats_found, record.files_scanned);
//!
//!     for entry in engine.list_quarantine()? {
//!         println!("{} -> {}", entry.original_path.display(), entry.threat_label);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: Fundamental types, fingerprinting and error handling
//! - **Signatures**: Digest to threat-label table with atomic reload
//! - **Cloud**: The boundary trait for the remote verdict service
//! - **Verdict**: Precedence rules combining signature and cloud answers
//! - **Scanner**: Enumeration, per-file evaluation, progress and cancellation
//! - **Quarantine**: Isolate, restore and purge with store consistency
//! - **Store**: SQLite persistence for history, quarantine entries and settings
//! - **History**: CSV and JSON export of the history log
//! - **Engine**: The caller-facing facade that owns all of the above
//! - **Audit**: Structured audit events on a dedicated tracing target

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod cloud;
pub mod config;
pub mod core;
pub mod engine;
pub mod history;
pub mod logging;
pub mod quarantine;
pub mod scanner;
pub mod signatures;
pub mod store;
pub mod verdict;

// Re-export commonly used types at the crate root
pub use crate::core::{
    CloudError, DetectionMethod, EngineError, FileHash, FileHasher, QuarantineError, ScanError,
    ScanKind, ScanProgress, ScanRecord, ScanVerdict, StoreError,
};

pub use crate::cloud::{CloudVerdict, CloudVerdictClient};
pub use crate::config::{EngineConfig, LoggingConfig};
pub use crate::engine::{Engine, ScanHandle, ScanParams};
pub use crate::history::ExportFormat;
pub use crate::logging::init_logging;
pub use crate::quarantine::{QuarantineEntry, QuarantineId};
pub use crate::scanner::ScanEvent;

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanward::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cloud::{CloudVerdict, CloudVerdictClient, MockCloudClient};
    pub use crate::config::{EngineConfig, LoggingConfig};
    pub use crate::core::{
        CloudError, DetectionMethod, EngineError, FileHash, FileHasher, QuarantineError,
        ScanError, ScanKind, ScanProgress, ScanRecord, ScanVerdict, StoreError,
    };
    pub use crate::engine::{Engine, ScanHandle, ScanParams};
    pub use crate::history::ExportFormat;
    pub use crate::quarantine::{PurgeReport, QuarantineEntry, QuarantineId};
    pub use crate::scanner::ScanEvent;
}
