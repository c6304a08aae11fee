//! Lending counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exactness per counter, not across counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by every component
#[derive(Debug, Default)]
pub struct LibraryMetrics {
    /// Successful borrows
    borrows: AtomicU64,
    /// Borrows refused (unavailable, duplicate, not found)
    rejected_borrows: AtomicU64,
    /// Successful returns
    returns: AtomicU64,
    /// Returns that carried a non-zero fee
    late_returns: AtomicU64,
    /// Sum of assessed late fees, minor units
    fees_assessed_minor: AtomicU64,
    consistency_errors: AtomicU64,
    reconcile_corrections: AtomicU64,
    notifications: AtomicU64,
    /// Compensating releases and restored borrowings
    rollbacks: AtomicU64,
}

impl LibraryMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_borrows(&self) {
        self.borrows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected_borrows(&self) {
        self.rejected_borrows.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed return and its fee
    pub fn record_return(&self, fee_minor_units: u64) {
        self.returns.fetch_add(1, Ordering::Relaxed);
        if fee_minor_units > 0 {
            self.late_returns.fetch_add(1, Ordering::Relaxed);
            self.fees_assessed_minor
                .fetch_add(fee_minor_units, Ordering::Relaxed);
        }
    }

    pub fn increment_consistency_errors(&self) {
        self.consistency_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconcile_corrections(&self) {
        self.reconcile_corrections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notifications(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rollbacks(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            borrows: self.borrows.load(Ordering::Relaxed),
            rejected_borrows: self.rejected_borrows.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            late_returns: self.late_returns.load(Ordering::Relaxed),
            fees_assessed_minor: self.fees_assessed_minor.load(Ordering::Relaxed),
            consistency_errors: self.consistency_errors.load(Ordering::Relaxed),
            reconcile_corrections: self.reconcile_corrections.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub borrows: u64,
    pub rejected_borrows: u64,
    pub returns: u64,
    pub late_returns: u64,
    pub fees_assessed_minor: u64,
    pub consistency_errors: u64,
    pub reconcile_corrections: u64,
    pub notifications: u64,
    pub rollbacks: u64,
}
