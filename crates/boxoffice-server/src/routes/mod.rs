//! HTTP routes. Handlers translate requests into service calls and wrap the
//! results in the response envelope.

pub mod auth;
pub mod events;
pub mod objects;
pub mod tickets;

use boxoffice_core::RecordKind;
use serde::{Deserialize, Serialize};

/// Data returned by the delete-all endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedCount {
    pub deleted: u64,
}

/// `/<kind>s/<id>`, used as the `Location` of created records.
pub fn location(kind: RecordKind, id: &str) -> String {
    format!("/{}/{id}", kind.collection())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location() {
        assert_eq!(location(RecordKind::Ticket, "t-1"), "/tickets/t-1");
    }
}
