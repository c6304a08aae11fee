//! # Borrowing Engine
//!
//! Owns the loan lifecycle: Open -> Closed, nothing else.
//!
//! ## Invariants
//! - a borrow reserves exactly one copy and creates exactly one open record,
//!   or does neither
//! - a return closes exactly one open record and releases exactly one copy,
//!   or does neither
//! - both transitions run under the book's ledger lock, so no other
//!   reserve/release on that book interleaves with them
//! - a closed borrowing is never modified again

mod fees;
mod record;

pub use fees::{FeeSchedule, Money};
pub use record::{Borrowing, BorrowingStatus, NewBorrowing};

use std::sync::{Arc, Mutex};

use chrono::Duration;

use crate::clock::Clock;
use crate::errors::{LibraryError, LibraryResult};
use crate::ids::{BookId, BorrowingId, UserId};
use crate::ledger::{AvailabilityLedger, LockedBook};
use crate::notifications::{NotificationKind, NotificationSink};
use crate::observability::{Event, LibraryMetrics};
use crate::store::LibraryStore;

/// Lending rules applied by the engine
#[derive(Debug, Clone)]
pub struct LendingPolicy {
    pub loan_period: Duration,
    pub fees: FeeSchedule,
    /// Let a user hold several open loans of the same title
    pub allow_duplicate_loans: bool,
    pub notify_on_return: bool,
    /// How close to its due date an open loan gets a due-soon notice
    pub due_soon_window: Duration,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_period: Duration::days(14),
            fees: FeeSchedule::default(),
            allow_duplicate_loans: false,
            notify_on_return: true,
            due_soon_window: Duration::days(2),
        }
    }
}

pub struct BorrowingEngine {
    store: Arc<dyn LibraryStore>,
    ledger: Arc<AvailabilityLedger>,
    notifications: Arc<NotificationSink>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LibraryMetrics>,
    policy: LendingPolicy,
    /// Serializes notice sweeps so each notice is sent once
    sweep: Mutex<()>,
}

impl BorrowingEngine {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        ledger: Arc<AvailabilityLedger>,
        notifications: Arc<NotificationSink>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LibraryMetrics>,
        policy: LendingPolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            notifications,
            clock,
            metrics,
            policy,
            sweep: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &LendingPolicy {
        &self.policy
    }

    // ==================
    // Borrow
    // ==================

    /// Lend one copy of `book_id` to `user`
    pub fn borrow(&self, user: UserId, book_id: BookId) -> LibraryResult<Borrowing> {
        let result = self
            .ledger
            .exclusive(book_id, |book| self.borrow_locked(book, user));

        match &result {
            Ok(borrowing) => {
                self.metrics.increment_borrows();
                tracing::info!(
                    event = %Event::BookBorrowed,
                    borrowing_id = %borrowing.id(),
                    book_id = %book_id,
                    user_id = %user,
                    due_date = %borrowing.due_date(),
                    "book borrowed"
                );
            }
            Err(e) if e.is_client_error() => {
                self.metrics.increment_rejected_borrows();
                tracing::info!(
                    event = %Event::BorrowRejected,
                    book_id = %book_id,
                    user_id = %user,
                    reason = %e,
                    "borrow rejected"
                );
            }
            Err(e) => {
                tracing::warn!(
                    event = %Event::BorrowRejected,
                    book_id = %book_id,
                    user_id = %user,
                    error = %e,
                    "borrow aborted"
                );
            }
        }
        result
    }

    fn borrow_locked(&self, book: &LockedBook<'_>, user: UserId) -> LibraryResult<Borrowing> {
        let book_id = book.book_id();
        // NotFound takes precedence over every other refusal
        book.load()?;

        if !self.policy.allow_duplicate_loans && self.has_open_loan(user, book_id)? {
            return Err(LibraryError::AlreadyBorrowing(book_id));
        }

        if !book.try_reserve()? {
            return Err(LibraryError::Unavailable(book_id));
        }

        let now = self.clock.now();
        let new = NewBorrowing {
            user_id: user,
            book_id,
            borrow_date: now,
            due_date: now + self.policy.loan_period,
        };

        match self.store.insert_borrowing(new) {
            Ok(borrowing) => Ok(borrowing),
            Err(store_err) => {
                self.metrics.increment_rollbacks();
                match book.release() {
                    Ok(()) => tracing::warn!(
                        event = %Event::ReservationRolledBack,
                        book_id = %book_id,
                        error = %store_err,
                        "loan record not written; reservation released"
                    ),
                    Err(release_err) => tracing::error!(
                        event = %Event::ReservationRolledBack,
                        book_id = %book_id,
                        error = %store_err,
                        release_error = %release_err,
                        "reservation could not be released; reconciliation required"
                    ),
                }
                Err(store_err.into())
            }
        }
    }

    fn has_open_loan(&self, user: UserId, book_id: BookId) -> LibraryResult<bool> {
        Ok(self
            .store
            .borrowings_for_user(user)?
            .iter()
            .any(|b| b.book_id() == book_id && b.is_open()))
    }

    // ==================
    // Return
    // ==================

    /// Close one of `user`'s open loans and put the copy back.
    ///
    /// A borrowing that belongs to someone else is reported as not found.
    pub fn return_book(&self, user: UserId, borrowing_id: BorrowingId) -> LibraryResult<Borrowing> {
        let book_id = self.owned_borrowing(user, borrowing_id)?.book_id();

        let closed = self
            .ledger
            .exclusive(book_id, |book| self.return_locked(book, user, borrowing_id))?;

        self.metrics.record_return(closed.late_fee().minor_units());
        tracing::info!(
            event = %Event::BookReturned,
            borrowing_id = %borrowing_id,
            book_id = %book_id,
            user_id = %user,
            late_fee = %closed.late_fee(),
            "book returned"
        );

        if self.policy.notify_on_return {
            self.confirm_return(&closed);
        }
        Ok(closed)
    }

    fn return_locked(
        &self,
        book: &LockedBook<'_>,
        user: UserId,
        borrowing_id: BorrowingId,
    ) -> LibraryResult<Borrowing> {
        // Re-read under the lock; a concurrent return may have won
        let previous = self.owned_borrowing(user, borrowing_id)?;
        if !previous.is_open() {
            return Err(LibraryError::AlreadyReturned(borrowing_id));
        }

        // Refuse before anything is written
        book.check_release().map_err(|e| {
            tracing::error!(
                event = %Event::ReturnAborted,
                borrowing_id = %borrowing_id,
                error = %e,
                "return aborted before persisting"
            );
            e
        })?;

        let now = self.clock.now();
        let fee = self.policy.fees.late_fee(previous.due_date(), now);
        let mut closed = previous.clone();
        closed.close(now, fee)?;
        self.store.put_borrowing(&closed)?;

        if let Err(release_err) = book.release() {
            self.restore_open(&previous, &release_err);
            return Err(release_err);
        }
        Ok(closed)
    }

    /// Undo a persisted close whose release failed
    fn restore_open(&self, previous: &Borrowing, cause: &LibraryError) {
        self.metrics.increment_rollbacks();
        match self.store.put_borrowing(previous) {
            Ok(()) => tracing::warn!(
                event = %Event::ReturnAborted,
                borrowing_id = %previous.id(),
                error = %cause,
                "release failed; borrowing restored to open"
            ),
            Err(restore_err) => tracing::error!(
                event = %Event::ReturnAborted,
                borrowing_id = %previous.id(),
                book_id = %previous.book_id(),
                error = %cause,
                restore_error = %restore_err,
                "borrowing closed but copy not released; reconciliation required"
            ),
        }
    }

    fn confirm_return(&self, closed: &Borrowing) {
        let title = self.title_of(closed.book_id());
        let message = if closed.late_fee().is_zero() {
            format!("You returned '{}'. Thank you!", title)
        } else {
            format!(
                "You returned '{}'. A late fee of {} was charged.",
                title,
                closed.late_fee()
            )
        };

        if let Err(e) = self.notifications.emit_kind(
            closed.user_id(),
            message,
            NotificationKind::ReturnConfirmation,
            Some(closed.id()),
        ) {
            // The return itself already committed
            tracing::warn!(
                borrowing_id = %closed.id(),
                error = %e,
                "return confirmation not delivered"
            );
        }
    }

    /// Look up a borrowing owned by `user`
    pub fn owned_borrowing(&self, user: UserId, id: BorrowingId) -> LibraryResult<Borrowing> {
        self.store
            .get_borrowing(id)?
            .filter(|b| b.is_owned_by(user))
            .ok_or(LibraryError::BorrowingNotFound(id))
    }

    // ==================
    // Notices
    // ==================

    /// Send due-soon and overdue notices for open loans.
    ///
    /// Each kind goes out at most once per borrowing. Returns how many
    /// notices were emitted.
    pub fn sweep_notices(&self) -> LibraryResult<usize> {
        let _sweep = self.sweep.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();
        let mut emitted = 0;

        for borrowing in self.store.list_borrowings()? {
            if !borrowing.is_open() {
                continue;
            }

            let title = self.title_of(borrowing.book_id());
            let due = borrowing.due_date().format("%Y-%m-%d");
            let (kind, message) = if borrowing.is_overdue(now) {
                (
                    NotificationKind::Overdue,
                    format!("'{}' was due on {}. Late fees apply per day.", title, due),
                )
            } else if borrowing.due_date() - now <= self.policy.due_soon_window {
                (
                    NotificationKind::DueSoon,
                    format!("'{}' is due on {}.", title, due),
                )
            } else {
                continue;
            };

            let sent = self.notifications.emit_once(
                borrowing.user_id(),
                message,
                kind,
                borrowing.id(),
            )?;
            if sent.is_some() {
                emitted += 1;
            }
        }

        tracing::info!(
            event = %Event::NoticeSweepComplete,
            emitted,
            "notice sweep finished"
        );
        Ok(emitted)
    }

    fn title_of(&self, book_id: BookId) -> String {
        match self.store.get_book(book_id) {
            Ok(Some(book)) => book.metadata.title,
            _ => format!("book {}", book_id),
        }
    }
}
