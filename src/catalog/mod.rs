//! # Catalog
//!
//! Cataloging, browsing and editing titles. Copy counters are only touched
//! through the availability ledger; everything else is plain metadata.

mod book;
mod lookup;

pub use book::{category_key, normalize_isbn, Book, BookMetadata, BookUpdate};
pub use lookup::{CatalogLookup, GoogleBooksLookup, LookupError, StaticLookup, DEFAULT_VOLUMES_URL};

use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::errors::{LibraryError, LibraryResult};
use crate::ids::BookId;
use crate::ledger::{Availability, AvailabilityLedger};
use crate::observability::Event;
use crate::store::{LibraryStore, StoreError};

/// Outcome of a batch ISBN import. Failures do not abort the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogBatch {
    pub added: Vec<Book>,
    pub errors: Vec<String>,
}

pub struct Catalog {
    store: Arc<dyn LibraryStore>,
    ledger: Arc<AvailabilityLedger>,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        ledger: Arc<AvailabilityLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
        }
    }

    /// Catalog a title with every copy on the shelf
    pub fn create(&self, metadata: BookMetadata, quantity: u32) -> LibraryResult<Book> {
        let metadata = metadata.validate()?;
        if self.store.find_book_by_isbn13(&metadata.isbn_13)?.is_some() {
            return Err(LibraryError::DuplicateIsbn(metadata.isbn_13));
        }

        let isbn_13 = metadata.isbn_13.clone();
        let book = self
            .store
            .insert_book(metadata, Availability::new(quantity), self.clock.now())
            .map_err(|e| match e {
                // Lost a race with a concurrent create
                StoreError::Conflict(_) => LibraryError::DuplicateIsbn(isbn_13),
                other => other.into(),
            })?;

        tracing::info!(
            event = %Event::BookCataloged,
            book_id = %book.id,
            isbn_13 = %book.metadata.isbn_13,
            quantity,
            "book cataloged"
        );
        Ok(book)
    }

    /// Resolve each ISBN through `lookup` and catalog it with one copy
    pub async fn catalog_isbns(
        &self,
        lookup: &dyn CatalogLookup,
        isbns: &[String],
    ) -> LibraryResult<CatalogBatch> {
        if isbns.is_empty() {
            return Err(LibraryError::InvalidInput(
                "ISBN list is required".to_string(),
            ));
        }

        let mut batch = CatalogBatch::default();
        for isbn in isbns {
            let outcome = match lookup.lookup(isbn).await {
                Ok(metadata) => self.create(metadata, 1),
                Err(e) => Err(LibraryError::Lookup(e.to_string())),
            };

            match outcome {
                Ok(book) => batch.added.push(book),
                Err(e) => {
                    tracing::warn!(
                        event = %Event::CatalogEntryFailed,
                        isbn = %isbn,
                        error = %e,
                        "ISBN not cataloged"
                    );
                    batch
                        .errors
                        .push(format!("Error adding book with ISBN {}: {}", isbn, e));
                }
            }
        }
        Ok(batch)
    }

    pub fn list(&self) -> LibraryResult<Vec<Book>> {
        Ok(self.store.list_books()?)
    }

    pub fn get(&self, id: BookId) -> LibraryResult<Book> {
        self.store
            .get_book(id)?
            .ok_or(LibraryError::BookNotFound(id))
    }

    /// Case-insensitive match over title and authors; blank returns all
    pub fn search(&self, query: &str) -> LibraryResult<Vec<Book>> {
        Ok(self
            .store
            .list_books()?
            .into_iter()
            .filter(|b| b.matches(query))
            .collect())
    }

    /// Edit metadata and optionally resize the number of copies owned
    pub fn update(&self, id: BookId, patch: &BookUpdate) -> LibraryResult<Book> {
        patch.validate()?;
        let book = self
            .ledger
            .exclusive(id, |book| book.update(patch.quantity, |m| patch.apply_to(m)))?;

        tracing::info!(
            event = %Event::BookUpdated,
            book_id = %id,
            quantity = book.quantity(),
            available = book.available(),
            "book updated"
        );
        Ok(book)
    }

    /// Remove a title together with its borrowings
    pub fn delete(&self, id: BookId) -> LibraryResult<()> {
        let removed = self.ledger.exclusive(id, |_| {
            self.store
                .delete_book(id)?
                .ok_or(LibraryError::BookNotFound(id))
        })?;
        self.ledger.forget(id);

        tracing::info!(
            event = %Event::BookDeleted,
            book_id = %id,
            borrowings_removed = removed,
            "book deleted"
        );
        Ok(())
    }
}
