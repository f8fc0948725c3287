//! Bearer token middleware.
//!
//! ```ignore
//! use axum::middleware::from_fn_with_state;
//!
//! let protected = Router::new()
//!     .route("/tickets", get(list_tickets))
//!     .route_layer(from_fn_with_state(tokens.clone(), require_bearer));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::token::TokenService;

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::invalid_token("malformed Authorization header")),
    }
}

/// Rejects the request with 401 unless it carries a valid bearer token.
///
/// Validated claims are stored in the request extensions.
pub async fn require_bearer(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = match bearer_token(req.headers()).and_then(|token| tokens.validate(token)) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Bearer authentication failed");
            return e.into_response();
        }
    };

    tracing::debug!(jti = %claims.jti, "Token validated successfully");
    req.extensions_mut().insert(claims);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::token::AccessTokenClaims;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    fn service() -> Arc<TokenService> {
        Arc::new(
            TokenService::new(&AuthConfig {
                secret_key: "middleware-test-secret".into(),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    fn app(tokens: Arc<TokenService>) -> Router {
        Router::new()
            .route(
                "/protected",
                get(|Extension(claims): Extension<AccessTokenClaims>| async move { claims.sub }),
            )
            .route_layer(from_fn_with_state(tokens, require_bearer))
    }

    fn request(auth: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let response = app(service()).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbled_token_is_rejected() {
        let response = app(service())
            .oneshot(request(Some("Bearer garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let tokens = service();
        let token = tokens.issue().unwrap().token;
        let response = app(tokens)
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"anonymous");
    }
}
