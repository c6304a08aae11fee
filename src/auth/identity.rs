//! Caller identity
//!
//! User accounts live in an external identity service. The lending core
//! only ever sees the resolved [`Identity`].

use serde::{Deserialize, Serialize};

use super::errors::AuthResult;
use super::policy::{can_perform, Action, Role};
use crate::errors::{LibraryError, LibraryResult};
use crate::ids::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

impl Identity {
    /// `Forbidden` unless this caller's role allows `action`
    pub fn require(&self, action: Action) -> LibraryResult<()> {
        if can_perform(self.role, action) {
            Ok(())
        } else {
            Err(LibraryError::Forbidden(action))
        }
    }
}

/// Resolves a bearer token to a caller
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, bearer_token: &str) -> AuthResult<Identity>;
}
