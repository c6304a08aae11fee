//! Staff and Observability HTTP Routes
//!
//! Health check, reports, maintenance and counters.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::errors::ApiResult;
use super::extract::CurrentUser;
use super::state::AppState;
use crate::auth::Action;
use crate::history::LibraryReport;
use crate::ledger::AvailabilityCorrection;
use crate::observability::MetricsSnapshot;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub emitted: usize,
}

/// Health check route
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_handler))
}

/// Create staff routes
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports", get(report_handler))
        .route("/admin/reconcile", post(reconcile_handler))
        .route("/admin/notices/sweep", post(sweep_handler))
        .route("/observability/metrics", get(metrics_handler))
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<LibraryReport>> {
    user.require(Action::ViewReports)?;
    Ok(Json(state.library.report()?))
}

async fn reconcile_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<AvailabilityCorrection>>> {
    user.require(Action::ReconcileAvailability)?;
    Ok(Json(state.library.reconcile_all()?))
}

async fn sweep_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<SweepResponse>> {
    user.require(Action::SweepNotices)?;
    let emitted = state.library.engine().sweep_notices()?;
    Ok(Json(SweepResponse { emitted }))
}

/// Counters as JSON
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<MetricsSnapshot>> {
    user.require(Action::ViewMetrics)?;
    Ok(Json(state.library.metrics()))
}
