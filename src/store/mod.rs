//! # Library Store
//!
//! Persistence boundary for books, borrowings and notifications. The core
//! only needs short synchronous row operations; multi-step atomicity is the
//! ledger's job (per-book locks), not the store's.
//!
//! [`InMemoryStore`] is the bundled implementation. A relational backend
//! implements the same trait.

mod errors;
mod memory;
pub mod snapshot;

pub use errors::{StoreError, StoreResult};
pub use memory::{FaultPoint, InMemoryStore};
pub use snapshot::StoreSnapshot;

pub use crate::borrowing::NewBorrowing;
pub use crate::notifications::NewNotification;

use chrono::{DateTime, Utc};

use crate::borrowing::Borrowing;
use crate::catalog::{Book, BookMetadata};
use crate::ids::{BookId, BorrowingId, NotificationId, UserId};
use crate::ledger::Availability;
use crate::notifications::Notification;

/// Row-level storage operations
///
/// Listing methods return rows ordered by id ascending.
pub trait LibraryStore: Send + Sync {
    // ==================
    // Books
    // ==================

    /// Insert a new title. Fails with `Conflict` if the ISBN-13 is taken.
    fn insert_book(
        &self,
        metadata: BookMetadata,
        availability: Availability,
        added_at: DateTime<Utc>,
    ) -> StoreResult<Book>;

    fn get_book(&self, id: BookId) -> StoreResult<Option<Book>>;

    fn find_book_by_isbn13(&self, isbn_13: &str) -> StoreResult<Option<Book>>;

    fn list_books(&self) -> StoreResult<Vec<Book>>;

    /// Replace an existing row
    fn put_book(&self, book: &Book) -> StoreResult<()>;

    /// Delete a title and every borrowing of it.
    ///
    /// Returns the number of borrowings removed, or `None` if the book
    /// did not exist.
    fn delete_book(&self, id: BookId) -> StoreResult<Option<usize>>;

    // ==================
    // Borrowings
    // ==================

    fn insert_borrowing(&self, new: NewBorrowing) -> StoreResult<Borrowing>;

    fn get_borrowing(&self, id: BorrowingId) -> StoreResult<Option<Borrowing>>;

    fn put_borrowing(&self, borrowing: &Borrowing) -> StoreResult<()>;

    fn list_borrowings(&self) -> StoreResult<Vec<Borrowing>>;

    fn borrowings_for_user(&self, user: UserId) -> StoreResult<Vec<Borrowing>>;

    fn borrowings_for_book(&self, book: BookId) -> StoreResult<Vec<Borrowing>>;

    // ==================
    // Notifications
    // ==================

    fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification>;

    fn get_notification(&self, id: NotificationId) -> StoreResult<Option<Notification>>;

    fn put_notification(&self, notification: &Notification) -> StoreResult<()>;

    fn notifications_for_user(&self, user: UserId) -> StoreResult<Vec<Notification>>;
}
