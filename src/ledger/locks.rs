//! Per-book locks
//!
//! One mutex per title, created on first use. Holding a book's lock
//! serializes every availability transition on that book while leaving
//! other books free.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::{LibraryError, LibraryResult};
use crate::ids::BookId;
use crate::store::StoreError;

#[derive(Debug, Default)]
pub struct BookLocks {
    locks: Mutex<HashMap<BookId, Arc<Mutex<()>>>>,
}

impl BookLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for a book. Repeated calls for the same
    /// id return the same `Arc`.
    pub fn get(&self, id: BookId) -> LibraryResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LibraryError::Storage(StoreError::Poisoned("book lock table".into())))?;
        Ok(locks.entry(id).or_default().clone())
    }

    /// Drop the lock of a deleted book
    pub fn forget(&self, id: BookId) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(&id);
        }
    }

    /// Drop a book's lock if nobody else holds or waits on it
    pub fn discard_idle(&self, id: BookId) {
        if let Ok(mut locks) = self.locks.lock() {
            if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(&id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
