//! # History & Recommendations
//!
//! Read-only views over books and borrowings: a user's loan history,
//! category-based suggestions and the staff report.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::borrowing::Borrowing;
use crate::catalog::{category_key, Book};
use crate::clock::Clock;
use crate::errors::LibraryResult;
use crate::ids::{BookId, UserId};
use crate::store::LibraryStore;

/// One line of the most-borrowed ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopBorrowed {
    pub book_id: BookId,
    pub title: String,
    pub borrow_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryReport {
    pub total_books: usize,
    pub total_borrowings: usize,
    /// Open loans past their due date
    pub overdue_count: usize,
    pub top_borrowed: Vec<TopBorrowed>,
}

pub struct HistoryAggregator {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
    top_borrowed_limit: usize,
}

impl HistoryAggregator {
    pub fn new(store: Arc<dyn LibraryStore>, clock: Arc<dyn Clock>, top_borrowed_limit: usize) -> Self {
        Self {
            store,
            clock,
            top_borrowed_limit,
        }
    }

    /// Every borrowing of `user`, most recent first
    pub fn history(&self, user: UserId) -> LibraryResult<Vec<Borrowing>> {
        let mut borrowings = self.store.borrowings_for_user(user)?;
        borrowings.sort_by(|a, b| {
            b.borrow_date()
                .cmp(&a.borrow_date())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(borrowings)
    }

    /// Books sharing a category with anything the user has borrowed,
    /// excluding everything they have borrowed before
    pub fn recommendations(&self, user: UserId, limit: usize) -> LibraryResult<Vec<Book>> {
        let borrowed: HashSet<BookId> = self
            .store
            .borrowings_for_user(user)?
            .iter()
            .map(|b| b.book_id())
            .collect();
        if borrowed.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let books = self.store.list_books()?;
        let categories: HashSet<String> = books
            .iter()
            .filter(|b| borrowed.contains(&b.id))
            .flat_map(|b| b.metadata.categories.iter())
            .map(|c| category_key(c))
            .filter(|c| !c.is_empty())
            .collect();

        Ok(books
            .into_iter()
            .filter(|b| !borrowed.contains(&b.id))
            .filter(|b| categories.iter().any(|c| b.metadata.has_category(c)))
            .take(limit)
            .collect())
    }

    pub fn report(&self) -> LibraryResult<LibraryReport> {
        let now = self.clock.now();
        let books = self.store.list_books()?;
        let borrowings = self.store.list_borrowings()?;

        // Every cataloged book is ranked, borrowed or not
        let mut counts: BTreeMap<BookId, usize> = books.iter().map(|b| (b.id, 0)).collect();
        for borrowing in &borrowings {
            if let Some(count) = counts.get_mut(&borrowing.book_id()) {
                *count += 1;
            }
        }

        let titles: BTreeMap<BookId, &str> = books.iter().map(|b| (b.id, b.title())).collect();
        let mut ranked: Vec<(BookId, usize)> = counts.into_iter().collect();
        // BTreeMap order already gives id ascending; a stable sort keeps it for ties
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let top_borrowed = ranked
            .into_iter()
            .take(self.top_borrowed_limit)
            .map(|(book_id, borrow_count)| TopBorrowed {
                book_id,
                title: titles.get(&book_id).copied().unwrap_or_default().to_string(),
                borrow_count,
            })
            .collect();

        Ok(LibraryReport {
            total_books: books.len(),
            total_borrowings: borrowings.len(),
            overdue_count: borrowings.iter().filter(|b| b.is_overdue(now)).count(),
            top_borrowed,
        })
    }
}
