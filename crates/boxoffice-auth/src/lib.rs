//! Token issuance and bearer authentication for the boxoffice server.
//!
//! - [`token::TokenService`] mints and validates HS256 tokens
//! - [`middleware::require_bearer`] guards routes with those tokens

pub mod config;
pub mod error;
pub mod middleware;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use middleware::{bearer_token, require_bearer};
pub use token::{ANONYMOUS_SUBJECT, AccessTokenClaims, IssuedToken, TokenService};
