use serde::{Deserialize, Serialize};

/// Result of an update by id.
///
/// `matched` counts records found under the id, `modified` counts records
/// whose stored document actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateOutcome {
    pub const NONE: UpdateOutcome = UpdateOutcome {
        matched: 0,
        modified: 0,
    };

    #[must_use]
    pub fn new(matched: u64, modified: u64) -> Self {
        Self { matched, modified }
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.matched > 0
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified > 0
    }
}
