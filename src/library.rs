//! Library façade
//!
//! Wires the store, clock and counters into the catalog, ledger,
//! borrowing engine, aggregator and notification sink. The HTTP layer
//! and the CLI talk to this type only.

use std::sync::Arc;

use crate::borrowing::{Borrowing, BorrowingEngine};
use crate::catalog::{Book, Catalog};
use crate::clock::{Clock, SystemClock};
use crate::config::LibraryConfig;
use crate::errors::LibraryResult;
use crate::history::{HistoryAggregator, LibraryReport};
use crate::ids::{BookId, BorrowingId, UserId};
use crate::ledger::{AvailabilityCorrection, AvailabilityLedger};
use crate::notifications::NotificationSink;
use crate::observability::{LibraryMetrics, MetricsSnapshot};
use crate::store::LibraryStore;

pub struct Library {
    metrics: Arc<LibraryMetrics>,
    ledger: Arc<AvailabilityLedger>,
    catalog: Catalog,
    engine: BorrowingEngine,
    history: HistoryAggregator,
    notifications: Arc<NotificationSink>,
    recommendation_limit: usize,
}

impl Library {
    /// A library on the wall clock
    pub fn new(store: Arc<dyn LibraryStore>, config: &LibraryConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn LibraryStore>,
        clock: Arc<dyn Clock>,
        config: &LibraryConfig,
    ) -> Self {
        let metrics = Arc::new(LibraryMetrics::new());
        let ledger = Arc::new(AvailabilityLedger::new(store.clone(), metrics.clone()));
        let notifications = Arc::new(NotificationSink::new(
            store.clone(),
            clock.clone(),
            metrics.clone(),
        ));
        let catalog = Catalog::new(store.clone(), ledger.clone(), clock.clone());
        let engine = BorrowingEngine::new(
            store.clone(),
            ledger.clone(),
            notifications.clone(),
            clock.clone(),
            metrics.clone(),
            config.lending_policy(),
        );
        let history = HistoryAggregator::new(store, clock, config.top_borrowed_limit);

        Self {
            metrics,
            ledger,
            catalog,
            engine,
            history,
            notifications,
            recommendation_limit: config.recommendation_limit,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &AvailabilityLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &BorrowingEngine {
        &self.engine
    }

    pub fn history(&self) -> &HistoryAggregator {
        &self.history
    }

    pub fn notifications(&self) -> &NotificationSink {
        &self.notifications
    }

    pub fn borrow(&self, user: UserId, book_id: BookId) -> LibraryResult<Borrowing> {
        self.engine.borrow(user, book_id)
    }

    pub fn return_book(&self, user: UserId, borrowing_id: BorrowingId) -> LibraryResult<Borrowing> {
        self.engine.return_book(user, borrowing_id)
    }

    /// Suggestions capped at the configured limit
    pub fn recommendations(&self, user: UserId) -> LibraryResult<Vec<Book>> {
        self.history.recommendations(user, self.recommendation_limit)
    }

    pub fn report(&self) -> LibraryResult<LibraryReport> {
        self.history.report()
    }

    pub fn reconcile_all(&self) -> LibraryResult<Vec<AvailabilityCorrection>> {
        self.ledger.reconcile_all()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
