//! Single-slot admission for scan runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Admits at most one scan at a time; later requests are rejected, not queued.
#[derive(Debug, Default)]
pub struct ScanGate {
    active: AtomicBool,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl ScanGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a permit is held.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of scans admitted so far.
    pub fn admitted_count(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Number of scans rejected because another was running.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Takes the slot, or returns `None` if it is held.
    pub(crate) fn try_acquire(self: &Arc<Self>) -> Option<ScanPermit> {
        match self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                Some(ScanPermit {
                    gate: Arc::clone(self),
                })
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn release(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Holds the scan slot; dropping it frees the slot.
#[derive(Debug)]
pub(crate) struct ScanPermit {
    gate: Arc<ScanGate>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
