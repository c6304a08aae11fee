//! libris - library lending backend
//!
//! Catalog of titles with copy counts, a borrowing lifecycle with late
//! fees, loan history with category recommendations, and per-user
//! notifications, served over a JSON REST API.

pub mod auth;
pub mod borrowing;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod history;
pub mod http_server;
pub mod ids;
pub mod ledger;
pub mod library;
pub mod notifications;
pub mod observability;
pub mod store;

pub use errors::{LibraryError, LibraryResult};
pub use library::Library;
