use crate::record::{Record, RecordKind};
use crate::time::EPOCH;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

/// Store field holding the confirmation timestamp.
pub const CONFIRMATION_FIELD: &str = "confirmationTimestamp";

/// A user-owned object whose confirmation arrives asynchronously over the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    #[serde(default)]
    pub id: String,
    #[validate(length(min = 3, max = 100, message = "name must be 3 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[serde(with = "crate::time::rfc3339", default = "epoch")]
    pub confirmation_timestamp: OffsetDateTime,
}

fn epoch() -> OffsetDateTime {
    EPOCH
}

impl Object {
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_timestamp != EPOCH
    }

    pub fn notice(&self) -> ObjectNotice {
        ObjectNotice {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

impl Record for Object {
    const KIND: RecordKind = RecordKind::Object;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Payload published when an object is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNotice {
    pub id: String,
    pub user_id: String,
}
