//! Audit event types and emission functions.

use crate::core::{ScanKind, ScanRecord, ScanVerdict};
use crate::quarantine::{QuarantineEntry, QuarantineState};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target that every audit event is emitted on.
pub const AUDIT_TARGET: &str = "scanward::audit";

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a finished scan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Id of the run within this process.
    pub scan_id: String,

    /// Id of the persisted history record.
    pub record_id: i64,

    /// Kind of scan.
    pub kind: ScanKind,

    /// Files evaluated.
    pub files_scanned: u64,

    /// Infected verdicts.
    pub threats_found: u64,

    /// Infected files isolated during the run.
    pub threats_removed: u64,

    /// `false` if the run was cancelled.
    pub completed: bool,
}

impl ScanAuditEvent {
    /// Builds the event from a persisted record.
    pub fn from_record(scan_id: &str, record: &ScanRecord) -> Self {
        Self {
            timestamp: Utc::now(),
            scan_id: scan_id.to_string(),
            record_id: record.id,
            kind: record.kind,
            files_scanned: record.files_scanned,
            threats_found: record.threats_found,
            threats_removed: record.threats_removed,
            completed: record.completed,
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        if self.completed {
            "scan_completed"
        } else {
            "scan_cancelled"
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Quarantine operation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuarantineOperation {
    /// File moved into quarantine.
    Isolate,
    /// File moved back out.
    Restore,
    /// File deleted.
    Purge,
}

impl QuarantineOperation {
    /// State the entry is in after the operation.
    pub fn resulting_state(&self) -> QuarantineState {
        match self {
            Self::Isolate => QuarantineState::Active,
            Self::Restore => QuarantineState::Restored,
            Self::Purge => QuarantineState::Purged,
        }
    }
}

impl fmt::Display for QuarantineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isolate => write!(f, "isolate"),
            Self::Restore => write!(f, "restore"),
            Self::Purge => write!(f, "purge"),
        }
    }
}

/// Audit event for a quarantine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Entry id.
    pub quarantine_id: i64,

    /// MD5 of the quarantined content.
    pub content_hash: String,

    /// Operation performed.
    pub operation: QuarantineOperation,

    /// Entry state after the operation.
    pub state: QuarantineState,

    /// Threat label on the entry.
    pub threat_label: String,

    /// Where the file originally lived.
    pub original_path: String,
}

impl QuarantineAuditEvent {
    /// Builds the event for `operation` on `entry`.
    pub fn new(entry: &QuarantineEntry, operation: QuarantineOperation) -> Self {
        Self {
            timestamp: Utc::now(),
            quarantine_id: entry.id.get(),
            content_hash: entry.content_hash.clone(),
            operation,
            state: operation.resulting_state(),
            threat_label: entry.threat_label.clone(),
            original_path: entry.original_path.display().to_string(),
        }
    }
}

impl AuditEvent for QuarantineAuditEvent {
    fn event_type(&self) -> &'static str {
        "quarantine_operation"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(scan_id: &str, kind: ScanKind, total: u64, cloud_enabled: bool) {
    tracing::info!(
        target: AUDIT_TARGET,
        event_type = "scan_started",
        scan_id = %scan_id,
        kind = %kind,
        total_candidates = total,
        cloud_enabled,
        "Scan started"
    );
}

/// Emits an audit event for an infected verdict.
pub fn emit_threat_detected(scan_id: &str, verdict: &ScanVerdict) {
    tracing::warn!(
        target: AUDIT_TARGET,
        event_type = "threat_detected",
        scan_id = %scan_id,
        path = %verdict.path.display(),
        threat = %verdict.label_or_none(),
        method = %verdict.method,
        "Threat detected"
    );
}

/// Emits an audit event for a finished or cancelled scan.
pub fn emit_scan_finished(scan_id: &str, record: &ScanRecord) {
    let event = ScanAuditEvent::from_record(scan_id, record);
    tracing::info!(
        target: AUDIT_TARGET,
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        record_id = event.record_id,
        kind = %event.kind,
        files_scanned = event.files_scanned,
        threats_found = event.threats_found,
        threats_removed = event.threats_removed,
        completed = event.completed,
        "Scan finished"
    );
}

/// Emits an audit event for a quarantine operation.
pub fn emit_quarantine_event(entry: &QuarantineEntry, operation: QuarantineOperation) {
    let event = QuarantineAuditEvent::new(entry, operation);
    tracing::info!(
        target: AUDIT_TARGET,
        event_type = event.event_type(),
        quarantine_id = event.quarantine_id,
        content_hash = %event.content_hash,
        operation = %event.operation,
        state = ?event.state,
        threat = %event.threat_label,
        original_path = %event.original_path,
        "Quarantine operation performed"
    );
}

/// Emits an audit event for a signature table swap.
pub fn emit_signatures_reloaded(count: usize, generation: u64) {
    tracing::info!(
        target: AUDIT_TARGET,
        event_type = "signatures_reloaded",
        signature_count = count,
        generation,
        "Signature table reloaded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::QuarantineId;

    fn entry() -> QuarantineEntry {
        QuarantineEntry {
            id: QuarantineId(7),
            original_path: "/home/u/bad.exe".into(),
            quarantined_path: "/q/bad.exe".into(),
            content_hash: "abc".into(),
            threat_label: "Trojan.X".into(),
            quarantined_at: Utc::now(),
        }
    }

    #[test]
    fn test_quarantine_event_state() {
        let event = QuarantineAuditEvent::new(&entry(), QuarantineOperation::Purge);
        assert_eq!(event.quarantine_id, 7);
        assert_eq!(event.state, QuarantineState::Purged);
        assert_eq!(event.event_type(), "quarantine_operation");
        assert_eq!(QuarantineOperation::Restore.to_string(), "restore");
    }

    #[test]
    fn test_scan_event_type_tracks_completion() {
        let record = ScanRecord {
            id: 1,
            timestamp: Utc::now(),
            kind: ScanKind::Quick,
            files_scanned: 4,
            threats_found: 1,
            threats_removed: 0,
            files_unscannable: 0,
            dirs_skipped: 0,
            completed: false,
            detail_note: String::new(),
        };
        let event = ScanAuditEvent::from_record("scan-1", &record);
        assert_eq!(event.event_type(), "scan_cancelled");
        assert_eq!(event.files_scanned, 4);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "quick");
    }
}
