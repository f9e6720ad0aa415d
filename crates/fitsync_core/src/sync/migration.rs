//! One-shot copy of pre-sync local data into the remote store.
//!
//! # Responsibility
//! - Hold an ordered list of upserts built depth-first (root, node, leaf).
//! - Execute the list, stopping at the first failure.
//!
//! # Invariants
//! - Steps carry their original ids, so a retried plan rewrites the same rows.
//! - A parent step always precedes its children.
//! - Applied steps are never rolled back.

use crate::model::{RecordId, UserId};
use crate::repo::remote_store::{
    to_row, RemoteStore, Row, StoreError, StoreResult, Table, COLUMN_CREATED_AT, COLUMN_ID,
};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One upsert of a fully-formed row.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStep {
    pub table: Table,
    pub row: Row,
}

/// Ordered upserts, parents first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an upsert of `payload` keeping `id` and, when known,
    /// `created_at`. `parent_id` is required for child tables.
    pub fn push<T: Serialize>(
        &mut self,
        table: Table,
        id: RecordId,
        parent_id: Option<RecordId>,
        created_at: Option<i64>,
        payload: &T,
    ) -> StoreResult<()> {
        let mut row = to_row(payload)?;
        row.insert(COLUMN_ID.to_string(), Value::String(id.to_string()));
        if let Some(created_at) = created_at {
            row.insert(COLUMN_CREATED_AT.to_string(), Value::from(created_at));
        }
        match (table.parent(), parent_id) {
            (Some(link), Some(parent_id)) => {
                row.insert(link.column.to_string(), Value::String(parent_id.to_string()));
            }
            (Some(link), None) => {
                return Err(StoreError::MissingParent {
                    table,
                    column: link.column,
                })
            }
            (None, _) => {}
        }
        self.steps.push(MigrationStep { table, row });
        Ok(())
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug)]
pub enum MigrationError {
    /// Legacy blob could not be read into a plan.
    InvalidLegacyData(String),
    /// Step `step` (zero-based) of `total` failed; earlier steps were applied.
    StepFailed {
        step: usize,
        total: usize,
        table: Table,
        source: StoreError,
    },
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLegacyData(message) => write!(f, "invalid legacy data: {message}"),
            Self::StepFailed {
                step,
                total,
                table,
                source,
            } => write!(
                f,
                "migration step {} of {} ({table}) failed: {source}",
                step + 1,
                total
            ),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            Self::InvalidLegacyData(_) => None,
        }
    }
}

impl From<StoreError> for MigrationError {
    fn from(value: StoreError) -> Self {
        Self::InvalidLegacyData(value.to_string())
    }
}

/// Applies `plan` for `owner`, returning the number of applied steps.
pub fn run_plan(
    store: &dyn RemoteStore,
    owner: UserId,
    plan: &MigrationPlan,
) -> Result<usize, MigrationError> {
    let total = plan.len();
    for (index, step) in plan.steps().iter().enumerate() {
        if let Err(err) = store.upsert(step.table, owner, step.row.clone()) {
            warn!(
                "event=legacy_migration module=sync status=error step={} total={} table={} error={}",
                index + 1,
                total,
                step.table,
                err
            );
            return Err(MigrationError::StepFailed {
                step: index,
                total,
                table: step.table,
                source: err,
            });
        }
    }
    info!("event=legacy_migration module=sync status=ok steps={total}");
    Ok(total)
}
