//! Borrowing record
//!
//! One loan transaction. Open while `return_date` is unset; closing sets
//! the return date and the late fee exactly once, after which the record
//! never changes again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fees::Money;
use crate::errors::{LibraryError, LibraryResult};
use crate::ids::{BookId, BorrowingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowingStatus {
    Open,
    Closed,
}

/// Fields supplied when a loan starts; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowing {
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrowing {
    id: BorrowingId,
    user_id: UserId,
    book_id: BookId,
    borrow_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    late_fee: Money,
}

impl Borrowing {
    /// A new open loan
    pub fn open(id: BorrowingId, new: NewBorrowing) -> Self {
        Self {
            id,
            user_id: new.user_id,
            book_id: new.book_id,
            borrow_date: new.borrow_date,
            due_date: new.due_date,
            return_date: None,
            late_fee: Money::ZERO,
        }
    }

    pub fn id(&self) -> BorrowingId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn borrow_date(&self) -> DateTime<Utc> {
        self.borrow_date
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn return_date(&self) -> Option<DateTime<Utc>> {
        self.return_date
    }

    pub fn late_fee(&self) -> Money {
        self.late_fee
    }

    pub fn status(&self) -> BorrowingStatus {
        if self.return_date.is_none() {
            BorrowingStatus::Open
        } else {
            BorrowingStatus::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == BorrowingStatus::Open
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }

    /// Open and past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < now
    }

    /// Open -> Closed. The only transition a borrowing has.
    pub(crate) fn close(&mut self, returned_at: DateTime<Utc>, late_fee: Money) -> LibraryResult<()> {
        if !self.is_open() {
            return Err(LibraryError::AlreadyReturned(self.id));
        }
        self.return_date = Some(returned_at);
        self.late_fee = late_fee;
        Ok(())
    }
}
