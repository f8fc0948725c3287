use axum::{Router, extract::State, routing::post};
use boxoffice_api::{ApiError, ApiResult, Reply};
use boxoffice_auth::IssuedToken;

use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/token", post(issue_token))
}

/// Mints a token for any caller.
async fn issue_token(State(state): State<AppState>) -> ApiResult<IssuedToken> {
    let issued = state.tokens.issue().map_err(ApiError::from)?;
    tracing::debug!(expires_in = issued.expires_in, "access token issued");
    Ok(Reply::ok(issued, "Token generated successfully"))
}
