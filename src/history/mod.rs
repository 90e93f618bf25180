//! Exports of the scan history log.

use crate::core::error::{EngineError, EngineResult};
use crate::core::ScanRecord;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Column headers of the CSV export, in order.
pub const CSV_HEADER: [&str; 6] = [
    "Timestamp",
    "Scan Type",
    "Files Scanned",
    "Threats Found",
    "Threats Removed",
    "Details",
];

/// Output format of [`export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Header row, then one row per record.
    Csv,
    /// A JSON array of full records.
    Json,
}

impl ExportFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Picks a format from a file extension, if recognised.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Serialises `records` in the order given.
pub fn export(records: &[ScanRecord], format: ExportFormat) -> EngineResult<Vec<u8>> {
    match format {
        ExportFormat::Csv => export_csv(records),
        ExportFormat::Json => serde_json::to_vec_pretty(records).map_err(|e| EngineError::Export {
            reason: e.to_string(),
        }),
    }
}

fn export_csv(records: &[ScanRecord]) -> EngineResult<Vec<u8>> {
    let export_err = |e: csv::Error| EngineError::Export {
        reason: e.to_string(),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(export_err)?;
    for record in records {
        writer
            .write_record([
                record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                record.kind.label().to_string(),
                record.files_scanned.to_string(),
                record.threats_found.to_string(),
                record.threats_removed.to_string(),
                record.detail_note.clone(),
            ])
            .map_err(export_err)?;
    }
    writer.into_inner().map_err(|e| EngineError::Export {
        reason: e.to_string(),
    })
}

/// Writes an export to `path`, replacing any existing file.
pub fn write_export(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    std::fs::write(path, bytes).map_err(|e| EngineError::Export {
        reason: format!("cannot write {}: {e}", path.display()),
    })?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "History exported");
    Ok(())
}
