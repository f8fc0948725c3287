use axum::response::{IntoResponse, Response};
use boxoffice_api::ApiError;

/// Authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Token expired")]
    TokenExpired,

    #[error("Auth configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to sign token: {message}")]
    Signing { message: String },
}

impl AuthError {
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Returns `true` when the caller is at fault (401), `false` for server faults.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingToken | Self::InvalidToken { .. } | Self::TokenExpired
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::invalid_token("signature mismatch"),
            ErrorKind::InvalidIssuer => Self::invalid_token("unexpected issuer"),
            ErrorKind::InvalidAudience => Self::invalid_token("unexpected audience"),
            ErrorKind::MissingRequiredClaim(claim) => {
                Self::invalid_token(format!("missing claim {claim}"))
            }
            _ => Self::invalid_token(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            ApiError::unauthorized(err.to_string())
        } else {
            ApiError::internal(err.to_string())
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    #[test]
    fn test_client_errors() {
        assert!(AuthError::MissingToken.is_client_error());
        assert!(AuthError::TokenExpired.is_client_error());
        assert!(AuthError::invalid_token("x").is_client_error());
        assert!(!AuthError::configuration("x").is_client_error());
    }

    #[test]
    fn test_into_response_status() {
        let response = AuthError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

        let response = AuthError::signing("bad key").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
