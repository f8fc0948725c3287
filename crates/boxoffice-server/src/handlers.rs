use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<&'a str>,
}

pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            store: None,
            cache: None,
        }),
    )
}

/// Ready once the store answers and, in Redis mode, Redis accepts connections.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let probe = state
        .store
        .find(boxoffice_core::RecordKind::Event.collection(), "readiness-probe")
        .await;
    let store_ok = match probe {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "readiness: store check failed");
            false
        }
    };
    let cache_ok = match &state.cache {
        crate::cache::CacheBackend::Redis(_) => state.cache.is_redis_available().await,
        _ => true,
    };

    let status = if store_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: if status == StatusCode::OK { "ready" } else { "unavailable" },
            store: Some(state.store.backend_name()),
            cache: Some(state.cache.mode()),
        }),
    )
}
