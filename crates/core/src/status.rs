//! Record lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle tag for records that are never hard-deleted while history
/// references them (stock rows, orders).
///
/// Modeled as a tag rather than a boolean so that future states (e.g.
/// `Archived`) extend the enum instead of churning the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Deleted,
}

impl RecordStatus {
    pub fn is_active(self) -> bool {
        matches!(self, RecordStatus::Active)
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, RecordStatus::Deleted)
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Active
    }
}
