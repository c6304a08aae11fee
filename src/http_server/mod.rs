//! # HTTP Server Module
//!
//! REST surface of the lending service. Every route except `/health`
//! and the public book listing requires a bearer token; the role policy
//! is checked per endpoint.

mod admin_routes;
mod book_routes;
mod borrowing_routes;
mod config;
mod errors;
mod extract;
mod notification_routes;
mod server;
mod state;

pub use book_routes::{BorrowResponse, CreateBookRequest, IsbnImportResponse};
pub use borrowing_routes::{HistoryEntry, ReturnResponse};
pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use extract::CurrentUser;
pub use server::{build_router, HttpServer};
pub use state::AppState;
