use crate::id::{generate_id, is_blank};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three record kinds. Each has its own store collection and cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Event,
    Ticket,
    Object,
}

impl RecordKind {
    /// Singular name used in cache keys and log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Event => "event",
            RecordKind::Ticket => "ticket",
            RecordKind::Object => "object",
        }
    }

    /// Store collection (and route segment) for this kind.
    pub const fn collection(&self) -> &'static str {
        match self {
            RecordKind::Event => "events",
            RecordKind::Ticket => "tickets",
            RecordKind::Object => "objects",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyed record stored in one collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Assigns a generated id if the caller left it blank and returns the final id.
    fn ensure_id(&mut self) -> String {
        if is_blank(self.id()) {
            self.set_id(generate_id());
        }
        self.id().to_string()
    }
}
