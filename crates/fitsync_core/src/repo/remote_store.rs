//! Remote store contract: owner-scoped CRUD over named tables.
//!
//! # Responsibility
//! - Name every backing table and its parent link.
//! - Define the filtered CRUD trait every container talks to.
//! - Convert typed records to/from untyped rows.
//!
//! # Invariants
//! - Every call carries the owning user; there is no unscoped read or write.
//! - `insert` assigns `id` and `created_at`; `upsert` preserves supplied ones.
//! - Parent columns are write-once: patches may not touch them.

use crate::db::DbError;
use crate::model::{RecordId, UserId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Untyped row exchanged with the store: a JSON object.
pub type Row = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

pub const COLUMN_ID: &str = "id";
pub const COLUMN_USER_ID: &str = "user_id";
pub const COLUMN_CREATED_AT: &str = "created_at";

/// Logical tables exposed by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Weeks,
    Days,
    Exercises,
    ExerciseSets,
    Cardio,
    Meals,
    FoodSubstitutions,
    DiaryEntries,
    EvolutionWeeks,
    EvolutionExercises,
    EvolutionExerciseSets,
    EvolutionPhotos,
}

/// Link from a child table to the table owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub table: Table,
    /// Column on the child row holding the parent id.
    pub column: &'static str,
}

impl Table {
    pub const ALL: [Table; 12] = [
        Table::Weeks,
        Table::Days,
        Table::Exercises,
        Table::ExerciseSets,
        Table::Cardio,
        Table::Meals,
        Table::FoodSubstitutions,
        Table::DiaryEntries,
        Table::EvolutionWeeks,
        Table::EvolutionExercises,
        Table::EvolutionExerciseSets,
        Table::EvolutionPhotos,
    ];

    /// Stable table name used in storage and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Weeks => "weeks",
            Self::Days => "days",
            Self::Exercises => "exercises",
            Self::ExerciseSets => "exercise_sets",
            Self::Cardio => "cardio",
            Self::Meals => "meals",
            Self::FoodSubstitutions => "food_substitutions",
            Self::DiaryEntries => "diary_entries",
            Self::EvolutionWeeks => "evolution_weeks",
            Self::EvolutionExercises => "evolution_exercises",
            Self::EvolutionExerciseSets => "evolution_exercise_sets",
            Self::EvolutionPhotos => "evolution_photos",
        }
    }

    pub fn parse(value: &str) -> Option<Table> {
        Self::ALL.into_iter().find(|table| table.name() == value)
    }

    /// Parent link, or `None` for tables owned directly by the user.
    pub fn parent(self) -> Option<ParentLink> {
        let (table, column) = match self {
            Self::Weeks
            | Self::Meals
            | Self::DiaryEntries
            | Self::EvolutionWeeks
            | Self::EvolutionPhotos => return None,
            Self::Days => (Self::Weeks, "week_id"),
            Self::Exercises => (Self::Days, "day_id"),
            Self::ExerciseSets => (Self::Exercises, "exercise_id"),
            Self::Cardio => (Self::Days, "day_id"),
            Self::FoodSubstitutions => (Self::Meals, "meal_id"),
            Self::EvolutionExercises => (Self::EvolutionWeeks, "evolution_week_id"),
            Self::EvolutionExerciseSets => (Self::EvolutionExercises, "evolution_exercise_id"),
        };
        Some(ParentLink { table, column })
    }

    /// Returns whether `column` is managed by the store and cannot be patched.
    pub fn is_immutable_column(self, column: &str) -> bool {
        column == COLUMN_ID
            || column == COLUMN_USER_ID
            || column == COLUMN_CREATED_AT
            || self.parent().is_some_and(|link| link.column == column)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Owner-scoped row filter. There is deliberately no way to build one
/// without an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub owner: UserId,
    /// Restricts rows to these parent ids. An empty list matches nothing.
    pub parent_in: Option<Vec<RecordId>>,
    pub limit: Option<u32>,
}

impl Filter {
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner,
            parent_in: None,
            limit: None,
        }
    }

    pub fn with_parents(mut self, parents: impl IntoIterator<Item = RecordId>) -> Self {
        self.parent_in = Some(parents.into_iter().collect());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Remote store failures.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying database failure.
    Db(DbError),
    /// No row with this id exists for the owner in this table.
    NotFound { table: Table, id: RecordId },
    /// Row lacks the parent column its table requires.
    MissingParent {
        table: Table,
        column: &'static str,
    },
    /// Parent id does not name an owned row of the parent table.
    UnknownParent { table: Table, parent_id: RecordId },
    /// Upsert targeted an id owned by another user or table.
    OwnershipConflict { table: Table, id: RecordId },
    /// Patch tried to change a store-managed or parent column.
    ImmutableColumn { table: Table, column: String },
    /// Row cannot be converted to/from the typed record.
    InvalidRow(String),
    /// Store could not be reached or refused the request.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} row not found: {id}"),
            Self::MissingParent { table, column } => {
                write!(f, "{table} row requires parent column `{column}`")
            }
            Self::UnknownParent { table, parent_id } => {
                write!(f, "{table} parent not found: {parent_id}")
            }
            Self::OwnershipConflict { table, id } => {
                write!(f, "{table} row {id} belongs to another owner")
            }
            Self::ImmutableColumn { table, column } => {
                write!(f, "{table} column `{column}` cannot be updated")
            }
            Self::InvalidRow(message) => write!(f, "invalid row: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidRow(value.to_string())
    }
}

/// Filtered CRUD interface over named tables.
///
/// Implementations must enforce owner scoping on every call; callers never
/// rely on it for correctness but never bypass it either.
pub trait RemoteStore {
    /// Lists owned rows in creation order.
    fn select(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>>;
    /// Inserts one row; the store assigns `id` and `created_at`.
    fn insert(&self, table: Table, owner: UserId, row: Row) -> StoreResult<Row>;
    /// Merges `patch` into one owned row.
    fn update(&self, table: Table, id: RecordId, owner: UserId, patch: &Row) -> StoreResult<()>;
    /// Deletes one owned row and every descendant row.
    fn delete(&self, table: Table, id: RecordId, owner: UserId) -> StoreResult<()>;
    /// Inserts or replaces a row keeping its supplied `id` (and `created_at`
    /// when present).
    fn upsert(&self, table: Table, owner: UserId, row: Row) -> StoreResult<Row>;
}

/// Serializes a typed payload into a row.
pub fn to_row<T: Serialize>(value: &T) -> StoreResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::InvalidRow(format!(
            "expected object payload, got `{}`",
            json_kind(&other)
        ))),
    }
}

/// Serializes a child payload and attaches its parent id.
pub fn child_row<T: Serialize>(table: Table, parent_id: RecordId, value: &T) -> StoreResult<Row> {
    let link = table.parent().ok_or_else(|| {
        StoreError::InvalidRow(format!("{table} rows do not have a parent"))
    })?;
    let mut row = to_row(value)?;
    row.insert(link.column.to_string(), Value::String(parent_id.to_string()));
    Ok(row)
}

/// Deserializes one row into a typed record.
pub fn from_row<T: DeserializeOwned>(table: Table, row: Row) -> StoreResult<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|err| StoreError::InvalidRow(format!("{table}: {err}")))
}

/// Deserializes a batch of rows, failing on the first invalid one.
pub fn from_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(|row| from_row(table, row)).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
