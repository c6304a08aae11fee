//! # Library Errors
//!
//! Error kinds surfaced by the catalog, ledger, borrowing engine,
//! aggregator and notification sink. User errors and internal invariant
//! breaches are separate variants so callers can branch on them.

use thiserror::Error;

use crate::auth::Action;
use crate::ids::{BookId, BorrowingId, NotificationId};
use crate::store::StoreError;

/// Result type for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Library operation errors
#[derive(Debug, Clone, Error)]
pub enum LibraryError {
    // ==================
    // Not Found
    // ==================
    /// Book does not exist
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    /// Borrowing does not exist, or belongs to someone else
    #[error("Borrowing {0} not found")]
    BorrowingNotFound(BorrowingId),

    /// Notification does not exist, or belongs to someone else
    #[error("Notification {0} not found")]
    NotificationNotFound(NotificationId),

    // ==================
    // Lending rules
    // ==================
    /// No copies left to lend
    #[error("Book {0} is not available")]
    Unavailable(BookId),

    /// Return attempted on a closed borrowing
    #[error("Borrowing {0} has already been returned")]
    AlreadyReturned(BorrowingId),

    /// The user already has an open loan of this book
    #[error("Book {0} is already borrowed by this user")]
    AlreadyBorrowing(BookId),

    // ==================
    // Authorization
    // ==================
    #[error("Not permitted to {0}")]
    Forbidden(Action),

    // ==================
    // Catalog input
    // ==================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A book with ISBN-13 {0} is already cataloged")]
    DuplicateIsbn(String),

    // ==================
    // Internal
    // ==================
    /// An availability invariant would have been broken
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Persistence failed; the operation was aborted
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Catalog lookup collaborator failed
    #[error("Catalog lookup failed: {0}")]
    Lookup(String),
}

impl LibraryError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LibraryError::BookNotFound(_)
            | LibraryError::BorrowingNotFound(_)
            | LibraryError::NotificationNotFound(_) => 404,

            LibraryError::Unavailable(_)
            | LibraryError::AlreadyReturned(_)
            | LibraryError::InvalidInput(_) => 400,

            LibraryError::Forbidden(_) => 403,

            LibraryError::AlreadyBorrowing(_) | LibraryError::DuplicateIsbn(_) => 409,

            LibraryError::Consistency(_) => 500,
            LibraryError::Lookup(_) => 502,
            LibraryError::Storage(_) => 503,
        }
    }

    /// Client errors are expected outcomes; everything else is logged loudly
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
