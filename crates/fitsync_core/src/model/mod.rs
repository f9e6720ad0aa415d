//! Domain records for training, diet, and evolution tracking.
//!
//! # Responsibility
//! - Define the typed records each sync container keeps in memory.
//! - Define draft (insert) and patch (partial update) payloads.
//!
//! # Invariants
//! - Every persisted record carries `id`, `user_id` and `created_at`.
//! - Parent references (`week_id`, `day_id`, ...) never appear in patches.
//! - Deletion is permanent; there are no tombstones.

pub mod diet;
pub mod evolution;
pub mod ids;
pub mod training;

pub use ids::{legacy_record_id, normalize_calendar_date, RecordId, UserId};

/// Common shape of every record kept in a normalized collection.
pub trait Record {
    /// Stable store-assigned id.
    fn id(&self) -> RecordId;
    /// Owning parent id; `None` for records owned directly by the user.
    fn parent_id(&self) -> Option<RecordId>;
}

/// Trims a required display field, returning `None` when nothing remains.
pub(crate) fn normalize_required_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trims an optional free-text field; blank input collapses to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value.and_then(normalize_required_text)
}
