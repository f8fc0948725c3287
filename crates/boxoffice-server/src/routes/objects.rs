use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get},
};
use boxoffice_api::{ApiResult, Reply};
use boxoffice_core::{Object, RecordKind};

use super::{DeletedCount, location};
use crate::extract::ValidJson;
use crate::server::AppState;

/// Objects have no update route; confirmations arrive over the queue.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/objects", get(list_objects).post(create_object))
        .route("/objects/all", delete(delete_all_objects))
        .route("/objects/{id}", get(get_object).delete(delete_object))
}

async fn list_objects(State(state): State<AppState>) -> ApiResult<Vec<Object>> {
    let objects = state.objects.get_all().await?;
    Ok(Reply::ok(objects, "Objects retrieved successfully"))
}

async fn get_object(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Object> {
    let object = state.objects.get_by_id(&id).await?;
    Ok(Reply::ok(object, "Object retrieved successfully"))
}

async fn create_object(
    State(state): State<AppState>,
    ValidJson(object): ValidJson<Object>,
) -> ApiResult<Object> {
    let created = state.objects.create(object).await?;
    let location = location(RecordKind::Object, &created.id);
    Ok(Reply::created(created, location, "Object created successfully"))
}

async fn delete_object(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Object> {
    let deleted = state.objects.delete(&id).await?;
    Ok(Reply::ok(deleted, "Object deleted successfully"))
}

async fn delete_all_objects(State(state): State<AppState>) -> ApiResult<DeletedCount> {
    let deleted = state.objects.delete_all().await?;
    Ok(Reply::ok(
        DeletedCount { deleted },
        format!("{deleted} objects deleted"),
    ))
}
