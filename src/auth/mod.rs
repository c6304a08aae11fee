//! # Auth Module
//!
//! Bearer-token authentication and the role policy checked at the HTTP
//! boundary.

pub mod errors;
pub mod identity;
pub mod jwt;
pub mod policy;

pub use errors::{AuthError, AuthResult};
pub use identity::{Identity, IdentityProvider};
pub use jwt::{JwtClaims, JwtConfig, JwtManager};
pub use policy::{can_perform, Action, Role};
