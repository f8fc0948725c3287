use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get},
};
use boxoffice_api::{ApiResult, Reply};
use boxoffice_core::{Event, RecordKind};

use super::{DeletedCount, location};
use crate::extract::ValidJson;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/all", delete(delete_all_events))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}

async fn list_events(State(state): State<AppState>) -> ApiResult<Vec<Event>> {
    let events = state.events.get_all().await?;
    Ok(Reply::ok(events, "Events retrieved successfully"))
}

async fn get_event(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Event> {
    let event = state.events.get_by_id(&id).await?;
    Ok(Reply::ok(event, "Event retrieved successfully"))
}

async fn create_event(
    State(state): State<AppState>,
    ValidJson(event): ValidJson<Event>,
) -> ApiResult<Event> {
    let created = state.events.create(event).await?;
    let location = location(RecordKind::Event, &created.id);
    Ok(Reply::created(created, location, "Event created successfully"))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(event): ValidJson<Event>,
) -> ApiResult<Event> {
    let updated = state.events.update(&id, event).await?;
    Ok(Reply::ok(updated, "Event updated successfully"))
}

async fn delete_event(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Event> {
    let deleted = state.events.delete(&id).await?;
    Ok(Reply::ok(deleted, "Event deleted successfully"))
}

async fn delete_all_events(State(state): State<AppState>) -> ApiResult<DeletedCount> {
    let deleted = state.events.delete_all().await?;
    Ok(Reply::ok(
        DeletedCount { deleted },
        format!("{deleted} events deleted"),
    ))
}
