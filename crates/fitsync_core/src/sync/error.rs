//! Container operation errors.

use crate::model::RecordId;
use crate::repo::remote_store::{StoreError, Table};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure reason returned by container mutations.
#[derive(Debug)]
pub enum SyncError {
    /// No signed-in user, or the container was initialized for another one.
    NotAuthenticated,
    /// Input rejected before any store call.
    Validation(String),
    /// Target record (or required parent) is not in the local tree.
    UnknownRecord { table: Table, id: RecordId },
    /// A diary entry already exists for this date.
    DuplicateDiaryDate(NaiveDate),
    /// Remote store rejected or failed the call.
    Store(StoreError),
}

impl SyncError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "no authenticated user"),
            Self::Validation(message) => write!(f, "invalid input: {message}"),
            Self::UnknownRecord { table, id } => write!(f, "unknown {table} record: {id}"),
            Self::DuplicateDiaryDate(date) => {
                write!(f, "a diary entry already exists for {date}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
