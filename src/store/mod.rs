//! SQLite-backed persistence for scan history, quarantine entries and
//! settings.
//!
//! History supports delete-all through [`Store::clear_scan_history`].
//! Quarantine entries are removed individually, together with their files,
//! through [`crate::quarantine::QuarantineManager`].

mod queries;
mod sqlite;

pub use sqlite::{Store, SCHEMA_VERSION};

/// Settings key that overrides `cloud_enabled` from the configuration.
pub const SETTING_CLOUD_DETECTION: &str = "cloud_detection";

/// Settings key recorded for front ends; the engine does not act on it.
pub const SETTING_REAL_TIME_PROTECTION: &str = "real_time_protection";
