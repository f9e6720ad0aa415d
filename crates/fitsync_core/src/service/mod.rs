//! Per-domain synchronization containers.
//!
//! # Responsibility
//! - Own each domain's in-memory tree and keep it converged with the remote
//!   store and the local cache.
//! - Expose mutating and derived-read APIs to the presentation layer.
//!
//! # Invariants
//! - Each container is constructed explicitly with its [`SyncDeps`].
//! - Every attempted mutation notifies exactly once, except when no user is
//!   signed in.
//!
//! [`SyncDeps`]: crate::sync::SyncDeps

pub mod diet_service;
pub mod evolution_service;
pub(crate) mod legacy;
pub mod week_service;

use crate::model::{normalize_optional_text, normalize_required_text, Record, RecordId, UserId};
use crate::repo::remote_store::{
    child_row, from_row, from_rows, to_row, Filter, RemoteStore, Table,
};
use crate::sync::{Collection, SyncError, SyncResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Lists every row of a user-owned table.
pub(crate) fn select_owned<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    table: Table,
    user: UserId,
) -> SyncResult<Vec<T>> {
    let rows = store.select(table, &Filter::owned_by(user))?;
    Ok(from_rows(table, rows)?)
}

/// Lists rows of a child table under `parents`. No store call is made when
/// there are no parents.
pub(crate) fn select_children<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    table: Table,
    user: UserId,
    parents: Vec<RecordId>,
) -> SyncResult<Vec<T>> {
    if parents.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store.select(table, &Filter::owned_by(user).with_parents(parents))?;
    Ok(from_rows(table, rows)?)
}

/// Inserts one record and decodes the stored row.
pub(crate) fn insert_record<T: DeserializeOwned, D: Serialize>(
    store: &dyn RemoteStore,
    table: Table,
    user: UserId,
    parent_id: Option<RecordId>,
    draft: &D,
) -> SyncResult<T> {
    let row = match parent_id {
        Some(parent_id) => child_row(table, parent_id, draft)?,
        None => to_row(draft)?,
    };
    let inserted = store.insert(table, user, row)?;
    Ok(from_row(table, inserted)?)
}

pub(crate) fn update_record<P: Serialize>(
    store: &dyn RemoteStore,
    table: Table,
    id: RecordId,
    user: UserId,
    patch: &P,
) -> SyncResult<()> {
    let row = to_row(patch)?;
    store.update(table, id, user, &row)?;
    Ok(())
}

/// Looks a record up in local state, failing before any store call.
pub(crate) fn require_known<T: Record>(
    collection: &Collection<T>,
    table: Table,
    id: RecordId,
) -> SyncResult<&T> {
    collection
        .get(id)
        .ok_or(SyncError::UnknownRecord { table, id })
}

pub(crate) fn required_text(value: &str, field: &str) -> SyncResult<String> {
    normalize_required_text(value)
        .ok_or_else(|| SyncError::validation(format!("{field} is required")))
}

/// Normalizes a patched required field, if present.
pub(crate) fn patched_text(value: &Option<String>, field: &str) -> SyncResult<Option<String>> {
    value
        .as_deref()
        .map(|value| required_text(value, field))
        .transpose()
}

/// Normalizes a patched clearable field, if present.
pub(crate) fn patched_optional_text(value: &Option<Option<String>>) -> Option<Option<String>> {
    value
        .as_ref()
        .map(|inner| normalize_optional_text(inner.as_deref()))
}

pub(crate) fn ensure_patch(is_empty: bool) -> SyncResult<()> {
    if is_empty {
        return Err(SyncError::validation("nothing to update"));
    }
    Ok(())
}

/// Rejects a load that is not a finite, non-negative number. Non-finite
/// values would serialize as `null` and leave an undecodable row behind.
pub(crate) fn validate_weight(weight: Option<f64>) -> SyncResult<()> {
    if weight.is_some_and(|value| !value.is_finite() || value < 0.0) {
        return Err(SyncError::validation("weight must be a non-negative number"));
    }
    Ok(())
}

pub(crate) fn validate_set_values(
    set_number: Option<u32>,
    weight: Option<f64>,
) -> SyncResult<()> {
    if set_number == Some(0) {
        return Err(SyncError::validation("set number starts at 1"));
    }
    validate_weight(weight)
}

#[cfg(test)]
mod tests {
    use super::{validate_set_values, validate_weight};

    #[test]
    fn set_values_reject_zero_numbers_and_unusable_weights() {
        assert!(validate_set_values(Some(0), None).is_err());
        assert!(validate_set_values(Some(1), Some(-2.5)).is_err());
        assert!(validate_set_values(Some(1), Some(f64::NAN)).is_err());
        assert!(validate_set_values(None, Some(20.0)).is_ok());
        assert!(validate_weight(Some(f64::INFINITY)).is_err());
        assert!(validate_weight(Some(0.0)).is_ok());
        assert!(validate_weight(None).is_ok());
    }
}
