//! Notification HTTP Routes

use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};

use super::errors::ApiResult;
use super::extract::CurrentUser;
use super::state::AppState;
use crate::auth::Action;
use crate::ids::NotificationId;
use crate::notifications::Notification;

/// Create notification routes
pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_handler))
        .route("/notifications/:id/read", post(mark_read_handler))
}

/// The caller's notifications, newest first
async fn list_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Notification>>> {
    let identity = user.require(Action::ViewNotifications)?;
    Ok(Json(state.library.notifications().list(identity.user_id)?))
}

async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Notification>> {
    let identity = user.require(Action::MarkNotificationRead)?;
    let Path(id) = path?;
    let notification = state
        .library
        .notifications()
        .mark_read(NotificationId::new(id), identity.user_id)?;
    Ok(Json(notification))
}
