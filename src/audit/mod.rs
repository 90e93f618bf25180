//! Structured audit logging.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate on the `scanward::audit` target. Events can be
//! routed to their own file by any tracing subscriber.

mod events;

pub use events::{
    emit_quarantine_event, emit_scan_finished, emit_scan_started, emit_signatures_reloaded,
    emit_threat_detected, AuditEvent, QuarantineAuditEvent, QuarantineOperation, ScanAuditEvent,
    AUDIT_TARGET,
};
