use crate::record::{Record, RecordKind};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

/// A scheduled event that tickets are sold for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "crate::time::rfc3339")]
    pub date: OffsetDateTime,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
}

impl Record for Event {
    const KIND: RecordKind = RecordKind::Event;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
