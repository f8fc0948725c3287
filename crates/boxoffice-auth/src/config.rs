//! Token signing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Settings for minting and checking bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `iss` claim written into and required from every token.
    pub issuer: String,

    /// `aud` claim written into and required from every token.
    pub audience: String,

    /// Shared HS256 secret.
    pub secret_key: String,

    /// How long an issued token stays valid.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Require a bearer token on the event routes as well.
    pub protect_events: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "boxoffice".into(),
            audience: "boxoffice-clients".into(),
            secret_key: String::new(),
            token_lifetime: Duration::from_secs(30 * 60 * 60),
            protect_events: false,
        }
    }
}

impl AuthConfig {
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when a signing setting is missing.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::configuration("auth.issuer must not be empty"));
        }
        if self.audience.trim().is_empty() {
            return Err(AuthError::configuration("auth.audience must not be empty"));
        }
        if self.secret_key.is_empty() {
            return Err(AuthError::configuration("auth.secret_key must not be empty"));
        }
        if self.token_lifetime.is_zero() {
            return Err(AuthError::configuration(
                "auth.token_lifetime must be greater than zero",
            ));
        }
        Ok(())
    }
}
