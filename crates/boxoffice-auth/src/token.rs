//! HS256 access tokens.
//!
//! Tokens carry no user identity. Holding a token proves only that it was
//! signed with the shared secret, for the configured issuer and audience,
//! and has not expired.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Subject written into tokens issued without an identity check.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Response body of the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    /// Seconds until expiry.
    pub expires_in: u64,
}

/// Signs and validates tokens with a shared secret.
pub struct TokenService {
    issuer: String,
    audience: String,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the settings are incomplete.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        let secret = config.secret_key.as_bytes();
        Ok(Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: config.token_lifetime,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Mints a token for any caller.
    pub fn issue(&self) -> Result<IssuedToken, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime_secs = i64::try_from(self.lifetime.as_secs())
            .map_err(|_| AuthError::configuration("token lifetime is too large"))?;

        let claims = AccessTokenClaims {
            sub: ANONYMOUS_SUBJECT.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now.saturating_add(lifetime_secs),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(IssuedToken {
            token: self.encode(&claims)?,
            token_type: "Bearer".to_string(),
            expires_in: self.lifetime.as_secs(),
        })
    }

    pub fn encode(&self, claims: &AccessTokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::signing(e.to_string()))
    }

    /// Checks signature, issuer, audience and expiry.
    pub fn validate(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            issuer: "boxoffice-test".into(),
            audience: "boxoffice-test-clients".into(),
            secret_key: "a-test-secret-that-is-long-enough".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let service = TokenService::new(&config()).unwrap();
        let issued = service.issue().unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 108_000);
        assert_eq!(issued.token.split('.').count(), 3);

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, ANONYMOUS_SUBJECT);
        assert_eq!(claims.iss, "boxoffice-test");
        assert_eq!(claims.aud, "boxoffice-test-clients");
        assert_eq!(claims.exp - claims.iat, 108_000);
    }

    #[test]
    fn test_each_token_is_unique() {
        let service = TokenService::new(&config()).unwrap();
        let a = service.validate(&service.issue().unwrap().token).unwrap();
        let b = service.validate(&service.issue().unwrap().token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let service = TokenService::new(&config()).unwrap();
        let other = TokenService::new(&AuthConfig {
            secret_key: "another-secret-entirely".into(),
            ..config()
        })
        .unwrap();

        let token = other.issue().unwrap().token;
        assert!(matches!(
            service.validate(&token),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_issuer_and_audience() {
        let service = TokenService::new(&config()).unwrap();

        let wrong_issuer = TokenService::new(&AuthConfig {
            issuer: "someone-else".into(),
            ..config()
        })
        .unwrap();
        assert!(service.validate(&wrong_issuer.issue().unwrap().token).is_err());

        let wrong_audience = TokenService::new(&AuthConfig {
            audience: "other-clients".into(),
            ..config()
        })
        .unwrap();
        assert!(service.validate(&wrong_audience.issue().unwrap().token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let service = TokenService::new(&config()).unwrap();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims {
            sub: ANONYMOUS_SUBJECT.into(),
            iss: "boxoffice-test".into(),
            aud: "boxoffice-test-clients".into(),
            iat: now - 7200,
            exp: now - 3600,
            jti: "old".into(),
        };
        let token = service.encode(&claims).unwrap();
        assert!(matches!(
            service.validate(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let service = TokenService::new(&config()).unwrap();
        assert!(service.validate("not.a.jwt").is_err());
        assert!(service.validate("").is_err());
    }

    #[test]
    fn test_new_rejects_missing_secret() {
        let err = TokenService::new(&AuthConfig::default()).unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }
}
