//! In-memory store
//!
//! Ordered maps behind one `RwLock`, sequential ids starting at 1.
//! Faults can be injected at named points so tests can exercise the
//! abort and compensation paths of the borrowing engine.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
use super::{LibraryStore, NewBorrowing, NewNotification};
use crate::borrowing::Borrowing;
use crate::catalog::{Book, BookMetadata};
use crate::ids::{BookId, BorrowingId, NotificationId, UserId};
use crate::ledger::Availability;
use crate::notifications::Notification;

/// Named points where a write can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    InsertBook,
    PutBook,
    DeleteBook,
    InsertBorrowing,
    PutBorrowing,
    InsertNotification,
    PutNotification,
}

impl FaultPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultPoint::InsertBook => "insert_book",
            FaultPoint::PutBook => "put_book",
            FaultPoint::DeleteBook => "delete_book",
            FaultPoint::InsertBorrowing => "insert_borrowing",
            FaultPoint::PutBorrowing => "put_borrowing",
            FaultPoint::InsertNotification => "insert_notification",
            FaultPoint::PutNotification => "put_notification",
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    borrowings: BTreeMap<BorrowingId, Borrowing>,
    notifications: BTreeMap<NotificationId, Notification>,
    next_book_id: u64,
    next_borrowing_id: u64,
    next_notification_id: u64,
}

impl Tables {
    fn empty() -> Self {
        Self {
            next_book_id: 1,
            next_borrowing_id: 1,
            next_notification_id: 1,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    faults: Mutex<HashSet<FaultPoint>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::empty()),
            faults: Mutex::new(HashSet::new()),
        }
    }

    /// Make the next write at `point` fail with `StoreError::Unavailable`
    pub fn fail_next(&self, point: FaultPoint) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(point);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    fn check_fault(&self, point: FaultPoint) -> StoreResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Poisoned("fault table".to_string()))?;
        if faults.remove(&point) {
            return Err(StoreError::Unavailable(format!(
                "injected fault at {}",
                point.as_str()
            )));
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Poisoned("tables".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Poisoned("tables".to_string()))
    }

    // ==================
    // Snapshots
    // ==================

    /// Copy out every table
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        let tables = self.read()?;
        Ok(StoreSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            books: tables.books.values().cloned().collect(),
            borrowings: tables.borrowings.values().cloned().collect(),
            notifications: tables.notifications.values().cloned().collect(),
        })
    }

    /// Rebuild a store from a snapshot, validating it first
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        snapshot.validate()?;

        let mut tables = Tables::empty();
        for book in snapshot.books {
            tables.next_book_id = tables.next_book_id.max(book.id.get() + 1);
            tables.books.insert(book.id, book);
        }
        for borrowing in snapshot.borrowings {
            tables.next_borrowing_id = tables.next_borrowing_id.max(borrowing.id().get() + 1);
            tables.borrowings.insert(borrowing.id(), borrowing);
        }
        for notification in snapshot.notifications {
            tables.next_notification_id =
                tables.next_notification_id.max(notification.id.get() + 1);
            tables.notifications.insert(notification.id, notification);
        }

        Ok(Self {
            tables: RwLock::new(tables),
            faults: Mutex::new(HashSet::new()),
        })
    }
}

impl LibraryStore for InMemoryStore {
    fn insert_book(
        &self,
        metadata: BookMetadata,
        availability: Availability,
        added_at: DateTime<Utc>,
    ) -> StoreResult<Book> {
        self.check_fault(FaultPoint::InsertBook)?;
        let mut tables = self.write()?;

        if tables
            .books
            .values()
            .any(|b| b.metadata.isbn_13 == metadata.isbn_13)
        {
            return Err(StoreError::Conflict(format!(
                "isbn_13 {} already exists",
                metadata.isbn_13
            )));
        }

        let id = BookId::new(tables.next_book_id);
        tables.next_book_id += 1;
        let book = Book::from_parts(id, metadata, availability, added_at);
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.read()?.books.get(&id).cloned())
    }

    fn find_book_by_isbn13(&self, isbn_13: &str) -> StoreResult<Option<Book>> {
        Ok(self
            .read()?
            .books
            .values()
            .find(|b| b.metadata.isbn_13 == isbn_13)
            .cloned())
    }

    fn list_books(&self) -> StoreResult<Vec<Book>> {
        Ok(self.read()?.books.values().cloned().collect())
    }

    fn put_book(&self, book: &Book) -> StoreResult<()> {
        self.check_fault(FaultPoint::PutBook)?;
        let mut tables = self.write()?;
        match tables.books.get_mut(&book.id) {
            Some(existing) => {
                *existing = book.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("book {}", book.id))),
        }
    }

    fn delete_book(&self, id: BookId) -> StoreResult<Option<usize>> {
        self.check_fault(FaultPoint::DeleteBook)?;
        let mut tables = self.write()?;
        if tables.books.remove(&id).is_none() {
            return Ok(None);
        }

        let before = tables.borrowings.len();
        tables.borrowings.retain(|_, b| b.book_id() != id);
        Ok(Some(before - tables.borrowings.len()))
    }

    fn insert_borrowing(&self, new: NewBorrowing) -> StoreResult<Borrowing> {
        self.check_fault(FaultPoint::InsertBorrowing)?;
        let mut tables = self.write()?;
        if !tables.books.contains_key(&new.book_id) {
            return Err(StoreError::Missing(format!("book {}", new.book_id)));
        }

        let id = BorrowingId::new(tables.next_borrowing_id);
        tables.next_borrowing_id += 1;
        let borrowing = Borrowing::open(id, new);
        tables.borrowings.insert(id, borrowing.clone());
        Ok(borrowing)
    }

    fn get_borrowing(&self, id: BorrowingId) -> StoreResult<Option<Borrowing>> {
        Ok(self.read()?.borrowings.get(&id).cloned())
    }

    fn put_borrowing(&self, borrowing: &Borrowing) -> StoreResult<()> {
        self.check_fault(FaultPoint::PutBorrowing)?;
        let mut tables = self.write()?;
        match tables.borrowings.get_mut(&borrowing.id()) {
            Some(existing) => {
                *existing = borrowing.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("borrowing {}", borrowing.id()))),
        }
    }

    fn list_borrowings(&self) -> StoreResult<Vec<Borrowing>> {
        Ok(self.read()?.borrowings.values().cloned().collect())
    }

    fn borrowings_for_user(&self, user: UserId) -> StoreResult<Vec<Borrowing>> {
        Ok(self
            .read()?
            .borrowings
            .values()
            .filter(|b| b.user_id() == user)
            .cloned()
            .collect())
    }

    fn borrowings_for_book(&self, book: BookId) -> StoreResult<Vec<Borrowing>> {
        Ok(self
            .read()?
            .borrowings
            .values()
            .filter(|b| b.book_id() == book)
            .cloned()
            .collect())
    }

    fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        self.check_fault(FaultPoint::InsertNotification)?;
        let mut tables = self.write()?;
        let id = NotificationId::new(tables.next_notification_id);
        tables.next_notification_id += 1;
        let notification = Notification::from_new(id, new);
        tables.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    fn get_notification(&self, id: NotificationId) -> StoreResult<Option<Notification>> {
        Ok(self.read()?.notifications.get(&id).cloned())
    }

    fn put_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.check_fault(FaultPoint::PutNotification)?;
        let mut tables = self.write()?;
        match tables.notifications.get_mut(&notification.id) {
            Some(existing) => {
                *existing = notification.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!(
                "notification {}",
                notification.id
            ))),
        }
    }

    fn notifications_for_user(&self, user: UserId) -> StoreResult<Vec<Notification>> {
        Ok(self
            .read()?
            .notifications
            .values()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect())
    }
}
