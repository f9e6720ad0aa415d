//! Identifiers and calendar-date helpers shared by all domains.
//!
//! # Invariants
//! - Store-assigned ids are UUID v4.
//! - Legacy ids that are not UUIDs map to the same UUID v5 on every call, so
//!   parent/child links survive a migration and a retried migration hits the
//!   same rows.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// Authenticated user identifier supplied by the session provider.
pub type UserId = Uuid;

/// Record identifier, assigned by the remote store on insert.
pub type RecordId = Uuid;

/// Namespace for ids derived from non-UUID legacy identifiers.
const LEGACY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8b3d_4e59_a0c7_51d2_e8f4_9b36);

static CALENDAR_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4}-\d{2}-\d{2})(?:[T ][0-9:.]*(?:Z|[+-]\d{2}:?\d{2})?)?\s*$")
        .expect("valid calendar date regex")
});

/// Maps a legacy identifier onto a [`RecordId`].
///
/// UUID strings are preserved verbatim; anything else (e.g. millisecond
/// timestamps used by older clients) becomes a deterministic UUID v5.
pub fn legacy_record_id(raw: &str) -> RecordId {
    let trimmed = raw.trim();
    match Uuid::parse_str(trimmed) {
        Ok(id) => id,
        Err(_) => Uuid::new_v5(&LEGACY_ID_NAMESPACE, trimmed.as_bytes()),
    }
}

/// Derives a deterministic child id from a parent id and a discriminator.
pub(crate) fn derived_record_id(parent: RecordId, discriminator: &str) -> RecordId {
    let name = format!("{parent}/{discriminator}");
    Uuid::new_v5(&LEGACY_ID_NAMESPACE, name.as_bytes())
}

/// Parses `YYYY-MM-DD` or an ISO datetime and returns its calendar date.
///
/// Returns `None` for anything else, including impossible dates such as
/// `2024-02-30`.
pub fn normalize_calendar_date(value: &str) -> Option<NaiveDate> {
    let caps = CALENDAR_DATE_RE.captures(value)?;
    let date_part = caps.get(1)?.as_str();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
