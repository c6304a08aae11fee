//! Role policy
//!
//! One function decides what a role may do. Every endpoint names its
//! [`Action`] and asks [`can_perform`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "librarian" => Ok(Role::Librarian),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Everything an authenticated caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewCatalog,
    Borrow,
    Return,
    ViewOwnHistory,
    ViewRecommendations,
    ViewNotifications,
    MarkNotificationRead,
    ManageCatalog,
    ViewReports,
    SweepNotices,
    ReconcileAvailability,
    ViewMetrics,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewCatalog => "view the catalog",
            Action::Borrow => "borrow books",
            Action::Return => "return books",
            Action::ViewOwnHistory => "view borrowing history",
            Action::ViewRecommendations => "view recommendations",
            Action::ViewNotifications => "view notifications",
            Action::MarkNotificationRead => "mark notifications read",
            Action::ManageCatalog => "manage the catalog",
            Action::ViewReports => "view reports",
            Action::SweepNotices => "send loan notices",
            Action::ReconcileAvailability => "reconcile availability",
            Action::ViewMetrics => "view metrics",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single authorization policy
pub fn can_perform(role: Role, action: Action) -> bool {
    use Action::*;

    match role {
        Role::Admin => true,
        Role::Librarian => !matches!(action, ReconcileAvailability | ViewMetrics),
        Role::Customer => matches!(
            action,
            ViewCatalog
                | Borrow
                | Return
                | ViewOwnHistory
                | ViewRecommendations
                | ViewNotifications
                | MarkNotificationRead
        ),
    }
}
