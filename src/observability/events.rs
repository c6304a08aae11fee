//! Observable events
//!
//! Every structured log line carries one of these as its `event` field.
//! Events are explicit and typed.

use std::fmt;

/// Observable events in the lending service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Server bound and accepting requests
    ServerStart,
    /// Graceful shutdown finished
    ServerStop,
    /// Configuration loaded and validated
    ConfigLoaded,

    // Persistence
    /// Store restored from a snapshot file
    SnapshotLoaded,
    /// Store written to a snapshot file
    SnapshotSaved,

    // Catalog
    BookCataloged,
    BookUpdated,
    BookDeleted,
    /// One ISBN of a batch could not be cataloged
    CatalogEntryFailed,

    // Loans
    BookBorrowed,
    BorrowRejected,
    /// Reservation released because the loan record could not be written
    ReservationRolledBack,
    BookReturned,
    /// Return abandoned before or after persisting
    ReturnAborted,

    // Availability
    /// Counter would leave `0..=quantity` (ERROR)
    ConsistencyViolation,
    /// Reconciliation rewrote a counter
    AvailabilityCorrected,
    ReconcileComplete,

    // Notifications
    NotificationEmitted,
    NoticeSweepComplete,

    // Boundary
    /// Request refused by the role policy
    AccessDenied,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ServerStart => "SERVER_START",
            Event::ServerStop => "SERVER_STOP",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::SnapshotLoaded => "SNAPSHOT_LOADED",
            Event::SnapshotSaved => "SNAPSHOT_SAVED",

            Event::BookCataloged => "BOOK_CATALOGED",
            Event::BookUpdated => "BOOK_UPDATED",
            Event::BookDeleted => "BOOK_DELETED",
            Event::CatalogEntryFailed => "CATALOG_ENTRY_FAILED",

            Event::BookBorrowed => "BOOK_BORROWED",
            Event::BorrowRejected => "BORROW_REJECTED",
            Event::ReservationRolledBack => "RESERVATION_ROLLED_BACK",
            Event::BookReturned => "BOOK_RETURNED",
            Event::ReturnAborted => "RETURN_ABORTED",

            Event::ConsistencyViolation => "CONSISTENCY_VIOLATION",
            Event::AvailabilityCorrected => "AVAILABILITY_CORRECTED",
            Event::ReconcileComplete => "RECONCILE_COMPLETE",

            Event::NotificationEmitted => "NOTIFICATION_EMITTED",
            Event::NoticeSweepComplete => "NOTICE_SWEEP_COMPLETE",

            Event::AccessDenied => "ACCESS_DENIED",
        }
    }

    /// Events that mean an invariant is at risk
    pub fn requires_attention(&self) -> bool {
        matches!(self, Event::ConsistencyViolation | Event::ReturnAborted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
