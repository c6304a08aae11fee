//! Borrowing HTTP Routes

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::ApiResult;
use super::extract::CurrentUser;
use super::state::AppState;
use crate::auth::Action;
use crate::borrowing::{Borrowing, BorrowingStatus, Money};
use crate::ids::{BookId, BorrowingId};

#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub message: String,
    /// Minor currency units
    pub late_fee: Money,
}

/// One history line, with the title resolved for display
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: BorrowingId,
    pub book_id: BookId,
    /// `None` when the title has since been removed from the catalog
    pub book_title: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub late_fee: Money,
    pub status: BorrowingStatus,
}

impl HistoryEntry {
    fn new(borrowing: &Borrowing, book_title: Option<String>) -> Self {
        Self {
            id: borrowing.id(),
            book_id: borrowing.book_id(),
            book_title,
            borrow_date: borrowing.borrow_date(),
            due_date: borrowing.due_date(),
            return_date: borrowing.return_date(),
            late_fee: borrowing.late_fee(),
            status: borrowing.status(),
        }
    }
}

/// Create borrowing routes
pub fn borrowing_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/borrowings/history", get(history_handler))
        .route("/borrowings/:id/return", post(return_handler))
}

async fn return_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<ReturnResponse>> {
    let identity = user.require(Action::Return)?;
    let Path(id) = path?;

    let closed = state
        .library
        .return_book(identity.user_id, BorrowingId::new(id))?;
    Ok(Json(ReturnResponse {
        message: "Book returned successfully.".to_string(),
        late_fee: closed.late_fee(),
    }))
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let identity = user.require(Action::ViewOwnHistory)?;
    let borrowings = state.library.history().history(identity.user_id)?;

    let titles: HashMap<BookId, String> = state
        .library
        .catalog()
        .list()?
        .into_iter()
        .map(|b| (b.id, b.metadata.title))
        .collect();

    let entries = borrowings
        .iter()
        .map(|b| HistoryEntry::new(b, titles.get(&b.book_id()).cloned()))
        .collect();
    Ok(Json(entries))
}
