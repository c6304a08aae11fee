//! # Availability Ledger
//!
//! The only code path that changes a book's `available` counter.
//!
//! ## Invariants
//! - `0 <= available <= quantity` for every stored book
//! - reserve/release/resize/reconcile on one book are serialized by that
//!   book's lock; callers that need several steps to be atomic (the
//!   borrowing engine, catalog edits) run them inside [`AvailabilityLedger::exclusive`]
//! - a release that would exceed `quantity` is refused and reported as a
//!   consistency error, never clamped silently
//! - reconciliation (`available = quantity - open loans`) is the
//!   authoritative repair after any suspected desynchronization

mod availability;
mod locks;

pub use availability::{Availability, AvailabilityError};
pub use locks::BookLocks;

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Book, BookMetadata};
use crate::errors::{LibraryError, LibraryResult};
use crate::ids::BookId;
use crate::observability::{Event, LibraryMetrics};
use crate::store::LibraryStore;

/// One repair made by reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityCorrection {
    pub book_id: BookId,
    pub quantity: u32,
    pub open_loans: u32,
    pub available_before: u32,
    pub available_after: u32,
}

/// Invariant-enforcing wrapper around the store's book rows
pub struct AvailabilityLedger {
    store: Arc<dyn LibraryStore>,
    locks: BookLocks,
    metrics: Arc<LibraryMetrics>,
}

impl AvailabilityLedger {
    pub fn new(store: Arc<dyn LibraryStore>, metrics: Arc<LibraryMetrics>) -> Self {
        Self {
            store,
            locks: BookLocks::new(),
            metrics,
        }
    }

    /// Run `f` while holding the book's lock.
    ///
    /// Must not be nested for the same book: the lock is not re-entrant.
    pub fn exclusive<R>(
        &self,
        book_id: BookId,
        f: impl FnOnce(&LockedBook<'_>) -> LibraryResult<R>,
    ) -> LibraryResult<R> {
        let result = {
            let lock = self.locks.get(book_id)?;
            // The mutex guards no data of its own, so a poisoned lock is still usable.
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&LockedBook {
                ledger: self,
                book_id,
            })
        };

        // Unknown ids must not leave lock entries behind
        if matches!(result, Err(LibraryError::BookNotFound(id)) if id == book_id) {
            self.locks.discard_idle(book_id);
        }
        result
    }

    /// Take one copy if any is available
    pub fn try_reserve(&self, book_id: BookId) -> LibraryResult<bool> {
        self.exclusive(book_id, |book| book.try_reserve())
    }

    /// Put one copy back on the shelf
    pub fn release(&self, book_id: BookId) -> LibraryResult<()> {
        self.exclusive(book_id, |book| book.release())
    }

    pub fn reconcile(&self, book_id: BookId) -> LibraryResult<Option<AvailabilityCorrection>> {
        self.exclusive(book_id, |book| book.reconcile())
    }

    /// Reconcile every cataloged book, returning the corrections made
    pub fn reconcile_all(&self) -> LibraryResult<Vec<AvailabilityCorrection>> {
        let mut corrections = Vec::new();
        for book in self.store.list_books()? {
            match self.reconcile(book.id) {
                Ok(Some(correction)) => corrections.push(correction),
                Ok(None) => {}
                // Deleted since the listing was taken
                Err(LibraryError::BookNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            event = %Event::ReconcileComplete,
            corrections = corrections.len(),
            "availability reconciliation finished"
        );
        Ok(corrections)
    }

    /// Forget the lock of a book that no longer exists
    pub(crate) fn forget(&self, book_id: BookId) {
        self.locks.forget(book_id);
    }

    fn consistency_error(&self, book_id: BookId, err: AvailabilityError) -> LibraryError {
        self.metrics.increment_consistency_errors();
        tracing::error!(
            event = %Event::ConsistencyViolation,
            book_id = %book_id,
            error = %err,
            "availability invariant would be broken; run reconciliation"
        );
        LibraryError::Consistency(format!("book {}: {}", book_id, err))
    }
}

/// Handle to a book whose lock is held
pub struct LockedBook<'a> {
    ledger: &'a AvailabilityLedger,
    book_id: BookId,
}

impl LockedBook<'_> {
    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn load(&self) -> LibraryResult<Book> {
        self.ledger
            .store
            .get_book(self.book_id)?
            .ok_or(LibraryError::BookNotFound(self.book_id))
    }

    pub fn try_reserve(&self) -> LibraryResult<bool> {
        let mut book = self.load()?;
        if !book.availability.try_reserve() {
            return Ok(false);
        }
        self.ledger.store.put_book(&book)?;
        Ok(true)
    }

    /// Fail with a consistency error if a release would overflow
    pub fn check_release(&self) -> LibraryResult<()> {
        let book = self.load()?;
        book.availability
            .check_release()
            .map_err(|e| self.ledger.consistency_error(self.book_id, e))
    }

    pub fn release(&self) -> LibraryResult<()> {
        let mut book = self.load()?;
        book.availability
            .release()
            .map_err(|e| self.ledger.consistency_error(self.book_id, e))?;
        self.ledger.store.put_book(&book)?;
        Ok(())
    }

    /// Apply a catalog edit, resizing the copy counters when asked.
    /// Metadata and counters are written back as one row.
    pub fn update(
        &self,
        quantity: Option<u32>,
        edit: impl FnOnce(&mut BookMetadata),
    ) -> LibraryResult<Book> {
        let mut book = self.load()?;
        if let Some(quantity) = quantity {
            book.availability
                .resize(quantity)
                .map_err(|e| LibraryError::InvalidInput(e.to_string()))?;
        }
        edit(&mut book.metadata);
        self.ledger.store.put_book(&book)?;
        Ok(book)
    }

    pub fn reconcile(&self) -> LibraryResult<Option<AvailabilityCorrection>> {
        let mut book = self.load()?;
        let open_loans = self
            .ledger
            .store
            .borrowings_for_book(self.book_id)?
            .iter()
            .filter(|b| b.is_open())
            .count();
        let open_loans = u32::try_from(open_loans).unwrap_or(u32::MAX);

        if open_loans > book.quantity() {
            self.ledger.metrics.increment_consistency_errors();
            tracing::error!(
                event = %Event::ConsistencyViolation,
                book_id = %self.book_id,
                quantity = book.quantity(),
                open_loans,
                "more open loans than copies owned"
            );
        }

        let Some(before) = book.availability.reconcile(open_loans) else {
            return Ok(None);
        };
        self.ledger.store.put_book(&book)?;

        let correction = AvailabilityCorrection {
            book_id: self.book_id,
            quantity: book.quantity(),
            open_loans,
            available_before: before.available(),
            available_after: book.available(),
        };
        self.ledger.metrics.increment_reconcile_corrections();
        tracing::warn!(
            event = %Event::AvailabilityCorrected,
            book_id = %self.book_id,
            available_before = correction.available_before,
            available_after = correction.available_after,
            open_loans,
            "availability counter repaired"
        );
        Ok(Some(correction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, NewBorrowing};
    use chrono::{Duration, Utc};
    use crate::ids::UserId;

    fn ledger_with_book(quantity: u32) -> (Arc<InMemoryStore>, AvailabilityLedger, BookId) {
        let store = Arc::new(InMemoryStore::new());
        let book = store
            .insert_book(
                BookMetadata::new("9780306406157", "Signals"),
                Availability::new(quantity),
                Utc::now(),
            )
            .unwrap();
        let ledger = AvailabilityLedger::new(store.clone(), Arc::new(LibraryMetrics::new()));
        (store, ledger, book.id)
    }

    #[test]
    fn test_reserve_decrements_until_empty() {
        let (store, ledger, id) = ledger_with_book(1);
        assert!(ledger.try_reserve(id).unwrap());
        assert!(!ledger.try_reserve(id).unwrap());
        assert_eq!(store.get_book(id).unwrap().unwrap().available(), 0);
    }

    #[test]
    fn test_reserve_unknown_book() {
        let (_, ledger, _) = ledger_with_book(1);
        let result = ledger.try_reserve(BookId::new(99));
        assert!(matches!(result, Err(LibraryError::BookNotFound(_))));
    }

    #[test]
    fn test_unknown_books_leave_no_locks() {
        let (_, ledger, id) = ledger_with_book(1);
        for missing in 100..600 {
            let result = ledger.try_reserve(BookId::new(missing));
            assert!(matches!(result, Err(LibraryError::BookNotFound(_))));
        }
        assert!(ledger.locks.is_empty());

        ledger.try_reserve(id).unwrap();
        assert_eq!(ledger.locks.len(), 1);
    }

    #[test]
    fn test_release_overflow_is_consistency_error() {
        let (store, ledger, id) = ledger_with_book(2);
        let result = ledger.release(id);
        assert!(matches!(result, Err(LibraryError::Consistency(_))));
        assert_eq!(store.get_book(id).unwrap().unwrap().available(), 2);
        assert_eq!(ledger.metrics.snapshot().consistency_errors, 1);
    }

    #[test]
    fn test_update_rejects_quantity_below_loans() {
        let (_, ledger, id) = ledger_with_book(2);
        ledger.try_reserve(id).unwrap();
        ledger.try_reserve(id).unwrap();

        let result = ledger.exclusive(id, |book| book.update(Some(1), |_| {}));
        assert!(matches!(result, Err(LibraryError::InvalidInput(_))));

        let book = ledger
            .exclusive(id, |book| book.update(Some(4), |m| m.title = "Noise".into()))
            .unwrap();
        assert_eq!((book.quantity(), book.available()), (4, 2));
        assert_eq!(book.title(), "Noise");
    }

    #[test]
    fn test_reconcile_repairs_from_open_loans() {
        let (store, ledger, id) = ledger_with_book(3);
        let now = Utc::now();
        store
            .insert_borrowing(NewBorrowing {
                user_id: UserId::new_random(),
                book_id: id,
                borrow_date: now,
                due_date: now + Duration::days(14),
            })
            .unwrap();

        // Counter says all three are on the shelf; one is actually out.
        let correction = ledger.reconcile(id).unwrap().unwrap();
        assert_eq!(correction.available_before, 3);
        assert_eq!(correction.available_after, 2);
        assert_eq!(correction.open_loans, 1);

        assert!(ledger.reconcile(id).unwrap().is_none());
        assert_eq!(ledger.reconcile_all().unwrap().len(), 0);
    }
}
