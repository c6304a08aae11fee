//! Catalog HTTP Routes
//!
//! Browsing is open to every authenticated caller (listing to anyone);
//! edits need `ManageCatalog`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ApiResult;
use super::extract::CurrentUser;
use super::state::AppState;
use crate::auth::Action;
use crate::catalog::{Book, BookMetadata, BookUpdate};
use crate::errors::LibraryError;
use crate::ids::{BookId, BorrowingId};

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    #[serde(flatten)]
    pub metadata: BookMetadata,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct IsbnImportRequest {
    #[serde(default)]
    pub isbn_list: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IsbnImportResponse {
    pub message: String,
    pub added_books: Vec<Book>,
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct BorrowResponse {
    pub message: String,
    pub borrowing_id: BorrowingId,
    pub due_date: DateTime<Utc>,
}

/// Create catalog routes
pub fn book_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(list_handler).post(create_handler))
        .route("/books/isbn", post(isbn_import_handler))
        .route("/books/search", get(search_handler))
        .route("/books/recommendations", get(recommendations_handler))
        .route(
            "/books/:id",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/books/:id/borrow", post(borrow_handler))
}

// ==================
// Handlers
// ==================

/// Public listing
async fn list_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.library.catalog().list()?))
}

async fn create_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    user.require(Action::ManageCatalog)?;
    let Json(request) = payload?;

    let book = state
        .library
        .catalog()
        .create(request.metadata, request.quantity)?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn isbn_import_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<IsbnImportRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IsbnImportResponse>)> {
    user.require(Action::ManageCatalog)?;
    let Json(request) = payload?;

    let lookup = state
        .lookup
        .clone()
        .ok_or_else(|| LibraryError::Lookup("ISBN lookup is disabled".to_string()))?;

    let batch = state
        .library
        .catalog()
        .catalog_isbns(lookup.as_ref(), &request.isbn_list)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IsbnImportResponse {
            message: format!("Added {} books successfully.", batch.added.len()),
            added_books: batch.added,
            errors: batch.errors,
        }),
    ))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Book>>> {
    user.require(Action::ViewCatalog)?;
    let Query(query) = query?;
    Ok(Json(state.library.catalog().search(&query.q)?))
}

async fn recommendations_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Book>>> {
    let identity = user.require(Action::ViewRecommendations)?;
    Ok(Json(state.library.recommendations(identity.user_id)?))
}

async fn get_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Book>> {
    user.require(Action::ViewCatalog)?;
    let Path(id) = path?;
    Ok(Json(state.library.catalog().get(BookId::new(id))?))
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<BookUpdate>, JsonRejection>,
) -> ApiResult<Json<Book>> {
    user.require(Action::ManageCatalog)?;
    let Path(id) = path?;
    let Json(patch) = payload?;
    Ok(Json(state.library.catalog().update(BookId::new(id), &patch)?))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<StatusCode> {
    user.require(Action::ManageCatalog)?;
    let Path(id) = path?;
    state.library.catalog().delete(BookId::new(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn borrow_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<BorrowResponse>> {
    let identity = user.require(Action::Borrow)?;
    let Path(id) = path?;

    let borrowing = state.library.borrow(identity.user_id, BookId::new(id))?;
    Ok(Json(BorrowResponse {
        message: "Book borrowed successfully.".to_string(),
        borrowing_id: borrowing.id(),
        due_date: borrowing.due_date(),
    }))
}
