//! Borrowing Lifecycle Tests
//!
//! End-to-end lending scenarios against the library façade with a
//! manual clock.
//!
//! Test Categories:
//! 1. Single-copy lending and late return
//! 2. Availability bounds across borrow/return
//! 3. Reporting over mixed open and closed loans
//! 4. Recovery from desynchronized counters

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use libris::borrowing::Money;
use libris::catalog::{Book, BookMetadata};
use libris::clock::{Clock, ManualClock};
use libris::config::LibraryConfig;
use libris::ids::{BookId, BorrowingId, UserId};
use libris::ledger::Availability;
use libris::notifications::NotificationKind;
use libris::store::{InMemoryStore, LibraryStore};
use libris::{Library, LibraryError};

fn library() -> (Library, Arc<InMemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let library = Library::with_clock(store.clone(), clock.clone(), &LibraryConfig::default());
    (library, store, clock)
}

fn catalog(library: &Library, isbn: &str, title: &str, quantity: u32) -> BookId {
    library
        .catalog()
        .create(BookMetadata::new(isbn, title), quantity)
        .unwrap()
        .id
}

fn available(library: &Library, id: BookId) -> u32 {
    library.catalog().get(id).unwrap().available()
}

// =============================================================================
// SINGLE COPY
// =============================================================================

/// One copy, two readers: the second waits until the first returns late.
#[test]
fn test_single_copy_late_return_scenario() {
    let (library, _, clock) = library();
    let book = catalog(&library, "9780441013593", "Dune", 1);
    let alice = UserId::new_random();
    let bob = UserId::new_random();
    let start = clock.now();

    let loan = library.borrow(alice, book).unwrap();
    assert_eq!(available(&library, book), 0);
    assert_eq!(loan.due_date(), start + Duration::days(14));

    let refused = library.borrow(bob, book);
    assert!(matches!(refused, Err(LibraryError::Unavailable(_))));
    assert_eq!(available(&library, book), 0);

    clock.set(start + Duration::days(20));
    let closed = library.return_book(alice, loan.id()).unwrap();
    assert_eq!(closed.late_fee(), Money::from_units(6));
    assert_eq!(closed.return_date(), Some(start + Duration::days(20)));
    assert_eq!(available(&library, book), 1);

    assert!(library.borrow(bob, book).is_ok());
    assert_eq!(available(&library, book), 0);
}

#[test]
fn test_on_time_return_is_free() {
    let (library, _, clock) = library();
    let book = catalog(&library, "9780441013593", "Dune", 1);
    let user = UserId::new_random();

    let loan = library.borrow(user, book).unwrap();
    clock.set(loan.due_date());
    let closed = library.return_book(user, loan.id()).unwrap();
    assert_eq!(closed.late_fee(), Money::ZERO);

    let notices = library.notifications().list(user).unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NotificationKind::ReturnConfirmation);
    assert!(!notices[0].is_read);
}

// =============================================================================
// AVAILABILITY BOUNDS
// =============================================================================

#[test]
fn test_borrow_then_return_restores_availability() {
    let (library, _, _) = library();
    let book = catalog(&library, "9780441013593", "Dune", 3);
    let user = UserId::new_random();

    let loan = library.borrow(user, book).unwrap();
    assert_eq!(available(&library, book), 2);
    library.return_book(user, loan.id()).unwrap();
    assert_eq!(available(&library, book), 3);
}

#[test]
fn test_second_return_changes_nothing() {
    let (library, store, clock) = library();
    let book = catalog(&library, "9780441013593", "Dune", 2);
    let user = UserId::new_random();

    let loan = library.borrow(user, book).unwrap();
    let closed = library.return_book(user, loan.id()).unwrap();

    clock.advance(Duration::days(40));
    let again = library.return_book(user, loan.id());
    assert!(matches!(again, Err(LibraryError::AlreadyReturned(_))));
    assert_eq!(store.get_borrowing(loan.id()).unwrap().unwrap(), closed);
    assert_eq!(available(&library, book), 2);
}

#[test]
fn test_counters_stay_in_bounds() {
    let (library, store, _) = library();
    let book = catalog(&library, "9780441013593", "Dune", 2);
    let users: Vec<_> = (0..4).map(|_| UserId::new_random()).collect();

    let mut loans = Vec::new();
    for user in &users {
        if let Ok(loan) = library.borrow(*user, book) {
            loans.push(loan);
        }
        let row = store.get_book(book).unwrap().unwrap();
        assert!(row.available() <= row.quantity());
    }
    assert_eq!(loans.len(), 2);

    for loan in &loans {
        library.return_book(loan.user_id(), loan.id()).unwrap();
        let row = store.get_book(book).unwrap().unwrap();
        assert!(row.available() <= row.quantity());
    }
    assert_eq!(available(&library, book), 2);
}

#[test]
fn test_unknown_book_and_borrowing() {
    let (library, _, _) = library();
    let user = UserId::new_random();
    assert!(matches!(
        library.borrow(user, BookId::new(404)),
        Err(LibraryError::BookNotFound(_))
    ));
    assert!(matches!(
        library.return_book(user, BorrowingId::new(404)),
        Err(LibraryError::BorrowingNotFound(_))
    ));
}

// =============================================================================
// REPORTING
// =============================================================================

/// Three titles, five loans, two of them open past their due date.
#[test]
fn test_report_over_mixed_loans() {
    let (library, _, clock) = library();
    let a = catalog(&library, "9780000000001", "A", 3);
    let b = catalog(&library, "9780000000002", "B", 3);
    let c = catalog(&library, "9780000000003", "C", 3);

    let overdue_1 = library.borrow(UserId::new_random(), a).unwrap();
    let overdue_2 = library.borrow(UserId::new_random(), b).unwrap();
    clock.advance(Duration::days(10));
    let returned_user = UserId::new_random();
    let returned = library.borrow(returned_user, a).unwrap();
    library.return_book(returned_user, returned.id()).unwrap();
    library.borrow(UserId::new_random(), a).unwrap();
    library.borrow(UserId::new_random(), b).unwrap();
    clock.advance(Duration::days(5));

    let report = library.report().unwrap();
    assert_eq!(report.total_books, 3);
    assert_eq!(report.total_borrowings, 5);
    assert_eq!(report.overdue_count, 2);
    let ranked: Vec<_> = report
        .top_borrowed
        .iter()
        .map(|t| (t.book_id, t.borrow_count))
        .collect();
    assert_eq!(ranked, vec![(a, 3), (b, 2), (c, 0)]);

    assert!(overdue_1.is_overdue(clock.now()));
    assert!(overdue_2.is_overdue(clock.now()));
}

#[test]
fn test_recommendations_skip_everything_borrowed() {
    let (library, _, _) = library();
    let user = UserId::new_random();
    let read = library
        .catalog()
        .create(
            BookMetadata::new("9780000000001", "Read").with_categories(["Science Fiction"]),
            1,
        )
        .unwrap();
    let open = library
        .catalog()
        .create(
            BookMetadata::new("9780000000002", "Open").with_categories(["science fiction"]),
            1,
        )
        .unwrap();
    let fresh = library
        .catalog()
        .create(
            BookMetadata::new("9780000000003", "Fresh").with_categories(["Science Fiction"]),
            1,
        )
        .unwrap();

    let loan = library.borrow(user, read.id).unwrap();
    library.return_book(user, loan.id()).unwrap();
    library.borrow(user, open.id).unwrap();

    let ids: Vec<_> = library
        .recommendations(user)
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(ids, vec![fresh.id]);
}

// =============================================================================
// RECOVERY
// =============================================================================

#[test]
fn test_reconcile_repairs_desynchronized_counter() {
    let (library, store, _) = library();
    let book = catalog(&library, "9780441013593", "Dune", 3);
    let user = UserId::new_random();
    library.borrow(user, book).unwrap();

    // A crash between steps left the counter claiming two copies are out
    let row = store.get_book(book).unwrap().unwrap();
    let drifted = Book::from_parts(
        row.id,
        row.metadata,
        Availability::from_counts(3, 1).unwrap(),
        row.added_at,
    );
    store.put_book(&drifted).unwrap();

    let corrections = library.reconcile_all().unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].available_before, 1);
    assert_eq!(corrections[0].available_after, 2);
    assert_eq!(available(&library, book), 2);
    assert_eq!(library.metrics().reconcile_corrections, 1);
}

#[test]
fn test_delete_cascades_loans() {
    let (library, store, _) = library();
    let book = catalog(&library, "9780441013593", "Dune", 2);
    let user = UserId::new_random();
    let loan = library.borrow(user, book).unwrap();
    library.return_book(user, loan.id()).unwrap();

    library.catalog().delete(book).unwrap();
    assert!(store.list_borrowings().unwrap().is_empty());
    // The return confirmation outlives the book
    assert_eq!(library.notifications().list(user).unwrap().len(), 1);
}
