//! Signature-based detection.
//!
//! The signature store maps known-bad digests to threat labels. It is loaded
//! once at engine start and can be reloaded at any time; a reload swaps the
//! whole table, so readers never see a partial update.

mod source;
mod table;

pub use source::{builtin_signatures, normalize_digest, read_signature_file, Signature};
pub use table::{SignatureStore, SignatureTable};
