//! Core types for the scanward engine.
//!
//! This module provides the fundamental building blocks used throughout
//! the crate:
//!
//! - [`types`] - `FileHash`, `ScanKind`, `DetectionMethod`, `FileCandidate`, `ScanProgress`
//! - [`error`] - Structured error types
//! - [`hasher`] - Streaming MD5/SHA-256/BLAKE3 fingerprinting
//! - [`result`] - Per-file verdicts and per-run scan records

pub mod error;
pub mod hasher;
pub mod result;
pub mod types;

// Re-export commonly used types at the core level
pub use error::{
    CloudError, CloudErrorKind, ConfigError, EngineError, QuarantineError, ScanError,
    SignatureError, StoreError,
};
pub use hasher::FileHasher;
pub use result::{NewScanRecord, ScanRecord, ScanTally, ScanVerdict};
pub use types::{DetectionMethod, FileCandidate, FileHash, ScanKind, ScanProgress};
