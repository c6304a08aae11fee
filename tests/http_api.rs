//! HTTP API Tests
//!
//! Drives the full router in-process with `tower::ServiceExt::oneshot`.
//! Covers bearer authentication, role checks, the error body shape and
//! a borrow/return/history round through the REST surface.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use libris::auth::{Identity, JwtConfig, JwtManager, Role};
use libris::catalog::{BookMetadata, StaticLookup};
use libris::config::LibraryConfig;
use libris::http_server::{build_router, AppState, HttpServerConfig};
use libris::ids::UserId;
use libris::store::InMemoryStore;
use libris::Library;

struct TestApp {
    router: Router,
    jwt: JwtManager,
}

impl TestApp {
    fn new() -> Self {
        let jwt = JwtManager::new(JwtConfig {
            secret: "an-http-test-secret-of-at-least-32-bytes".to_string(),
            access_token_ttl: Duration::minutes(5),
            issuer: "libris".to_string(),
            audience: "libris".to_string(),
        });
        let library = Arc::new(Library::new(
            Arc::new(InMemoryStore::new()),
            &LibraryConfig::default(),
        ));
        let lookup = StaticLookup::new().with(
            BookMetadata::new("9780553293357", "Foundation").with_categories(["Science Fiction"]),
        );
        let state = Arc::new(AppState::new(
            library,
            Arc::new(jwt.clone()),
            Some(Arc::new(lookup)),
        ));
        Self {
            router: build_router(&HttpServerConfig::default(), state),
            jwt,
        }
    }

    fn token(&self, role: Role) -> (UserId, String) {
        let identity = Identity {
            user_id: UserId::new_random(),
            name: format!("test {}", role),
            role,
        };
        let token = self.jwt.issue_token(&identity).unwrap();
        (identity.user_id, token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_book(&self, token: &str, isbn: &str, title: &str, quantity: u32) -> u64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/books",
                Some(token),
                Some(json!({ "isbn_13": isbn, "title": title, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_u64().unwrap()
    }
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_health_is_open() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_book_listing_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/borrowings/history", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, _) = app
        .send(Method::GET, "/borrowings/history", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// ROLE CHECKS
// =============================================================================

#[tokio::test]
async fn test_customer_cannot_manage_catalog_or_view_reports() {
    let app = TestApp::new();
    let (_, customer) = app.token(Role::Customer);

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(&customer),
            Some(json!({ "isbn_13": "9780441013593", "title": "Dune" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let (status, _) = app.send(Method::GET, "/reports", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_librarian_cannot_reconcile() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);
    let (_, admin) = app.token(Role::Admin);

    let (status, _) = app
        .send(Method::POST, "/admin/reconcile", Some(&librarian), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, "/admin/reconcile", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

// =============================================================================
// CATALOG
// =============================================================================

#[tokio::test]
async fn test_librarian_creates_and_customer_reads() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);
    let (_, customer) = app.token(Role::Customer);

    let id = app.create_book(&librarian, "9780441013593", "Dune", 2).await;

    let (status, body) = app
        .send(Method::GET, &format!("/books/{}", id), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["quantity"], 2);
    assert_eq!(body["available"], 2);

    let (status, body) = app
        .send(Method::GET, "/books/search?q=dun", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_isbn_conflicts() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);
    app.create_book(&librarian, "9780441013593", "Dune", 1).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(&librarian),
            Some(json!({ "isbn_13": "9780441013593", "title": "Dune again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let app = TestApp::new();
    let (_, customer) = app.token(Role::Customer);

    let (status, body) = app
        .send(Method::GET, "/books/9999", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert!(body["error"].as_str().unwrap().contains("9999"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(&librarian),
            Some(json!({ "title": 42 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_isbn_import_reports_misses() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);

    let (status, body) = app
        .send(
            Method::POST,
            "/books/isbn",
            Some(&librarian),
            Some(json!({ "isbn_list": ["9780553293357", "9780000000000"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["added_books"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

// =============================================================================
// LENDING
// =============================================================================

#[tokio::test]
async fn test_borrow_return_history_round() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);
    let (_, customer) = app.token(Role::Customer);
    let book = app.create_book(&librarian, "9780441013593", "Dune", 1).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/books/{}/borrow", book),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let borrowing = body["borrowing_id"].as_u64().unwrap();

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/books/{}/borrow", book),
            Some(&customer),
            None,
        )
        .await;
    assert!(status.is_client_error());

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/borrowings/{}/return", borrowing),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["late_fee"], 0);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/borrowings/{}/return", borrowing),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::GET, "/borrowings/history", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = body.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["book_title"], "Dune");
    assert!(history[0]["return_date"].is_string());

    let (status, body) = app
        .send(Method::GET, "/notifications", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_users_borrowing_is_not_found() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);
    let (_, owner) = app.token(Role::Customer);
    let (_, stranger) = app.token(Role::Customer);
    let book = app.create_book(&librarian, "9780441013593", "Dune", 1).await;

    let (_, body) = app
        .send(
            Method::POST,
            &format!("/books/{}/borrow", book),
            Some(&owner),
            None,
        )
        .await;
    let borrowing = body["borrowing_id"].as_u64().unwrap();

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/borrowings/{}/return", borrowing),
            Some(&stranger),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_counts_loans() {
    let app = TestApp::new();
    let (_, librarian) = app.token(Role::Librarian);
    let (_, customer) = app.token(Role::Customer);
    let book = app.create_book(&librarian, "9780441013593", "Dune", 3).await;
    app.send(
        Method::POST,
        &format!("/books/{}/borrow", book),
        Some(&customer),
        None,
    )
    .await;

    let (status, body) = app.send(Method::GET, "/reports", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_books"], 1);
    assert_eq!(body["total_borrowings"], 1);
    assert_eq!(body["overdue_count"], 0);
    assert_eq!(body["top_borrowed"][0]["book_id"], book);
}
