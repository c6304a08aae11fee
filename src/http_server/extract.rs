//! Request extractors

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::errors::ApiError;
use super::state::AppState;
use crate::auth::{Action, AuthError, Identity};

/// The authenticated caller, resolved from the bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl CurrentUser {
    /// Fail with 403 unless the caller's role allows `action`
    pub fn require(&self, action: Action) -> Result<&Identity, ApiError> {
        self.0.require(action)?;
        Ok(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::AuthenticationRequired)?
            .to_str()
            .map_err(|_| AuthError::MalformedToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedToken)?;

        let identity = state.identity.authenticate(token)?;
        Ok(CurrentUser(identity))
    }
}
