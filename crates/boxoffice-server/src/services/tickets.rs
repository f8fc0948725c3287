use boxoffice_core::{Ticket, now_utc};
use boxoffice_storage::DynStore;
use serde_json::Value;

use super::{RecordService, ServiceResult};
use crate::cache::RecordCache;

const BUYER_NAME_FIELD: &str = "buyerName";

#[derive(Clone)]
pub struct TicketService {
    inner: RecordService<Ticket>,
}

impl TicketService {
    pub fn new(store: DynStore, cache: RecordCache) -> Self {
        Self {
            inner: RecordService::new(store, cache),
        }
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Ticket>> {
        self.inner.get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Ticket> {
        self.inner.get_by_id(id).await
    }

    /// Stores the ticket with the purchase date stamped now.
    pub async fn create(&self, mut ticket: Ticket) -> ServiceResult<Ticket> {
        ticket.purchase_date = now_utc();
        self.inner.create(ticket).await
    }

    /// Changes the buyer name, the only mutable ticket field.
    pub async fn update_buyer_name(&self, id: &str, buyer_name: &str) -> ServiceResult<Ticket> {
        self.inner
            .update_field(id, BUYER_NAME_FIELD, Value::String(buyer_name.to_string()))
            .await
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Ticket> {
        self.inner.delete(id).await
    }

    pub async fn delete_all(&self) -> ServiceResult<u64> {
        self.inner.delete_all().await
    }
}
