use axum::{
    Router,
    extract::{Path, State},
    routing::{delete, get},
};
use boxoffice_api::{ApiResult, Reply};
use boxoffice_core::{RecordKind, Ticket, id::is_blank};
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{DeletedCount, location};
use crate::extract::ValidJson;
use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/all", delete(delete_all_tickets))
        .route(
            "/tickets/{id}",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
}

/// New buyer name, either as a bare JSON string or as `{"buyerName": ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BuyerNameUpdate {
    Plain(String),
    Wrapped {
        #[serde(rename = "buyerName")]
        buyer_name: String,
    },
}

impl BuyerNameUpdate {
    pub fn buyer_name(&self) -> &str {
        match self {
            BuyerNameUpdate::Plain(name) | BuyerNameUpdate::Wrapped { buyer_name: name } => name,
        }
    }
}

impl Validate for BuyerNameUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if is_blank(self.buyer_name()) {
            let mut errors = ValidationErrors::new();
            errors.add(
                "buyerName",
                ValidationError::new("length").with_message("buyerName is required".into()),
            );
            return Err(errors);
        }
        Ok(())
    }
}

async fn list_tickets(State(state): State<AppState>) -> ApiResult<Vec<Ticket>> {
    let tickets = state.tickets.get_all().await?;
    Ok(Reply::ok(tickets, "Tickets retrieved successfully"))
}

async fn get_ticket(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ticket> {
    let ticket = state.tickets.get_by_id(&id).await?;
    Ok(Reply::ok(ticket, "Ticket retrieved successfully"))
}

async fn create_ticket(
    State(state): State<AppState>,
    ValidJson(ticket): ValidJson<Ticket>,
) -> ApiResult<Ticket> {
    let created = state.tickets.create(ticket).await?;
    let location = location(RecordKind::Ticket, &created.id);
    Ok(Reply::created(created, location, "Ticket created successfully"))
}

async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(update): ValidJson<BuyerNameUpdate>,
) -> ApiResult<Ticket> {
    let updated = state
        .tickets
        .update_buyer_name(&id, update.buyer_name().trim())
        .await?;
    Ok(Reply::ok(updated, "Ticket updated successfully"))
}

async fn delete_ticket(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ticket> {
    let deleted = state.tickets.delete(&id).await?;
    Ok(Reply::ok(deleted, "Ticket deleted successfully"))
}

async fn delete_all_tickets(State(state): State<AppState>) -> ApiResult<DeletedCount> {
    let deleted = state.tickets.delete_all().await?;
    Ok(Reply::ok(
        DeletedCount { deleted },
        format!("{deleted} tickets deleted"),
    ))
}
