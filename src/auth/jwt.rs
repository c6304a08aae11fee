//! # JWT Token Management
//!
//! Bearer tokens carry the caller's id, display name and role. Tokens are
//! issued by an external identity service in production; `issue_token`
//! exists for operators and tests.
//!
//! ## Invariants
//! - Stateless validation (no store lookup)
//! - HS256 only; issuer and audience must match the configuration
//! - No secrets in token

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};
use super::identity::{Identity, IdentityProvider};
use super::policy::Role;
use crate::ids::UserId;

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    pub role: Role,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,

    pub aud: String,

    pub iss: String,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing (at least 32 bytes)
    pub secret: String,

    /// Access token lifetime
    pub access_token_ttl: Duration,

    /// Issuer identifier
    pub issuer: String,

    /// Audience identifier
    pub audience: String,
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a new JWT manager with the given configuration
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign a token for `identity`
    pub fn issue_token(&self, identity: &Identity) -> AuthResult<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: identity.user_id.to_string(),
            name: identity.name.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: self.expiration_from(now).timestamp(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenGenerationFailed)
    }

    /// Validate an access token and extract claims
    pub fn validate_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                    ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => {
                        AuthError::WrongAudience
                    }
                    _ => AuthError::MalformedToken,
                }
            })?;

        Ok(token_data.claims)
    }

    /// Build the caller identity from validated claims
    pub fn identity(claims: &JwtClaims) -> AuthResult<Identity> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedToken)?;
        Ok(Identity {
            user_id: UserId::from(user_id),
            name: claims.name.clone(),
            role: claims.role,
        })
    }

    fn expiration_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.config.access_token_ttl
    }
}

impl IdentityProvider for JwtManager {
    fn authenticate(&self, bearer_token: &str) -> AuthResult<Identity> {
        let claims = self.validate_token(bearer_token)?;
        Self::identity(&claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_testing_only_0123";

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_ttl: Duration::minutes(15),
            issuer: "test".to_string(),
            audience: "test".to_string(),
        }
    }

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new_random(),
            name: "Ada".to_string(),
            role: Role::Librarian,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let manager = JwtManager::new(config(SECRET));
        let identity = identity();

        let token = manager.issue_token(&identity).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(manager.authenticate(&token).unwrap(), identity);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let manager = JwtManager::new(config(SECRET));
        let result = manager.validate_token("invalid.token.here");
        assert!(matches!(
            result,
            Err(AuthError::MalformedToken) | Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new(config("secret_one_secret_one_secret_one_"));
        let verifier = JwtManager::new(config("secret_two_secret_two_secret_two_"));

        let token = issuer.issue_token(&identity()).unwrap();
        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let issuer = JwtManager::new(JwtConfig {
            audience: "other".to_string(),
            ..config(SECRET)
        });
        let verifier = JwtManager::new(config(SECRET));

        let token = issuer.issue_token(&identity()).unwrap();
        assert!(matches!(
            verifier.validate_token(&token),
            Err(AuthError::WrongAudience)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            name: String::new(),
            role: Role::Customer,
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            aud: "test".to_string(),
            iss: "test".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let manager = JwtManager::new(config(SECRET));
        assert!(matches!(
            manager.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_non_uuid_subject_is_malformed() {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: "alice".to_string(),
            name: String::new(),
            role: Role::Customer,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            aud: "test".to_string(),
            iss: "test".to_string(),
        };
        assert!(matches!(
            JwtManager::identity(&claims),
            Err(AuthError::MalformedToken)
        ));
    }
}
