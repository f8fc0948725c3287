use crate::record::{Record, RecordKind};
use crate::time::EPOCH;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

/// A sold ticket. `event_id` refers to an [`crate::Event`] but is not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 1, message = "eventId is required"))]
    pub event_id: String,
    #[validate(length(min = 1, message = "buyerName is required"))]
    pub buyer_name: String,
    /// Stamped by the server when the ticket is created.
    #[serde(with = "crate::time::rfc3339", default = "epoch")]
    pub purchase_date: OffsetDateTime,
}

fn epoch() -> OffsetDateTime {
    EPOCH
}

impl Record for Ticket {
    const KIND: RecordKind = RecordKind::Ticket;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_input_without_purchase_date() {
        let ticket: Ticket = serde_json::from_value(json!({
            "eventId": "evt-1",
            "buyerName": "Ada"
        }))
        .unwrap();
        assert_eq!(ticket.purchase_date, EPOCH);
        assert!(ticket.validate().is_ok());
    }

    #[test]
    fn test_ticket_requires_buyer() {
        let ticket: Ticket = serde_json::from_value(json!({
            "eventId": "evt-1",
            "buyerName": ""
        }))
        .unwrap();
        assert!(ticket.validate().is_err());
    }

    #[test]
    fn test_ticket_camel_case_output() {
        let ticket = Ticket {
            id: "t-1".into(),
            event_id: "evt-1".into(),
            buyer_name: "Ada".into(),
            purchase_date: EPOCH,
        };
        let value = serde_json::to_value(ticket).unwrap();
        assert_eq!(value["eventId"], "evt-1");
        assert_eq!(value["buyerName"], "Ada");
        assert_eq!(value["purchaseDate"], "1970-01-01T00:00:00Z");
    }
}
