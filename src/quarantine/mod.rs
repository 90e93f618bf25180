//! Quarantine area for infected files.
//!
//! Infected files are moved, not copied, into a dedicated directory and
//! tracked by an entry in the persistence store. Entries are either
//! restored to their original location or purged.

mod manager;
mod record;

pub use manager::{PurgeReport, QuarantineManager};
pub use record::{NewQuarantineEntry, QuarantineEntry, QuarantineId, QuarantineState};
