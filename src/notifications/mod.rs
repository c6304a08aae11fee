//! # Notification Sink
//!
//! Append-only user-facing messages. The system creates notifications;
//! only the owning user may flip `is_read`. Nothing here deletes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::errors::{LibraryError, LibraryResult};
use crate::ids::{BorrowingId, NotificationId, UserId};
use crate::observability::{Event, LibraryMetrics};
use crate::store::LibraryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    General,
    ReturnConfirmation,
    DueSoon,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub kind: NotificationKind,
    /// Loan this message is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowing_id: Option<BorrowingId>,
}

impl Notification {
    pub fn from_new(id: NotificationId, new: NewNotification) -> Self {
        Self {
            id,
            user_id: new.user_id,
            message: new.message,
            created_at: new.created_at,
            is_read: false,
            kind: new.kind,
            borrowing_id: new.borrowing_id,
        }
    }

    fn concerns(&self, kind: NotificationKind, borrowing_id: BorrowingId) -> bool {
        self.kind == kind && self.borrowing_id == Some(borrowing_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub kind: NotificationKind,
    pub borrowing_id: Option<BorrowingId>,
}

pub struct NotificationSink {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LibraryMetrics>,
}

impl NotificationSink {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LibraryMetrics>,
    ) -> Self {
        Self {
            store,
            clock,
            metrics,
        }
    }

    /// Append an unread general message for `user`
    pub fn emit(&self, user: UserId, message: impl Into<String>) -> LibraryResult<Notification> {
        self.emit_kind(user, message, NotificationKind::General, None)
    }

    pub fn emit_kind(
        &self,
        user: UserId,
        message: impl Into<String>,
        kind: NotificationKind,
        borrowing_id: Option<BorrowingId>,
    ) -> LibraryResult<Notification> {
        let notification = self.store.insert_notification(NewNotification {
            user_id: user,
            message: message.into(),
            created_at: self.clock.now(),
            kind,
            borrowing_id,
        })?;

        self.metrics.increment_notifications();
        tracing::debug!(
            event = %Event::NotificationEmitted,
            notification_id = %notification.id,
            user_id = %user,
            kind = ?kind,
            "notification emitted"
        );
        Ok(notification)
    }

    /// Emit a loan notice unless one of the same kind already exists.
    /// Returns `None` when it was already sent.
    pub fn emit_once(
        &self,
        user: UserId,
        message: impl Into<String>,
        kind: NotificationKind,
        borrowing_id: BorrowingId,
    ) -> LibraryResult<Option<Notification>> {
        let already_sent = self
            .store
            .notifications_for_user(user)?
            .iter()
            .any(|n| n.concerns(kind, borrowing_id));
        if already_sent {
            return Ok(None);
        }
        self.emit_kind(user, message, kind, Some(borrowing_id))
            .map(Some)
    }

    /// The user's notifications, newest first
    pub fn list(&self, user: UserId) -> LibraryResult<Vec<Notification>> {
        let mut notifications = self.store.notifications_for_user(user)?;
        notifications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(notifications)
    }

    pub fn unread_count(&self, user: UserId) -> LibraryResult<usize> {
        Ok(self
            .store
            .notifications_for_user(user)?
            .iter()
            .filter(|n| !n.is_read)
            .count())
    }

    /// Mark one of the user's own notifications as read.
    ///
    /// Someone else's notification is reported as not found.
    pub fn mark_read(&self, id: NotificationId, user: UserId) -> LibraryResult<Notification> {
        let mut notification = self
            .store
            .get_notification(id)?
            .filter(|n| n.user_id == user)
            .ok_or(LibraryError::NotificationNotFound(id))?;

        if !notification.is_read {
            notification.is_read = true;
            self.store.put_notification(&notification)?;
        }
        Ok(notification)
    }
}
