//! Scan orchestration.
//!
//! A run enumerates its roots once, caches the candidate list so progress
//! has a fixed denominator, then evaluates candidates one by one:
//! fingerprint on the blocking pool, signature lookup against a table
//! snapshot, optional bounded cloud submission, verdict aggregation.

mod orchestrator;
mod walk;

pub use orchestrator::{CancelFlag, Orchestrator, ScanEvent, ScanRequest, ScanSink};
pub use walk::{enumerate, Enumeration, ExtensionFilter};
