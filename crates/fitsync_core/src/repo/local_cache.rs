//! Durable per-user key/value slots for collection snapshots.
//!
//! # Responsibility
//! - Define the raw key/value [`LocalCache`] contract.
//! - Provide typed snapshot load/store helpers used by sync containers.
//!
//! # Invariants
//! - A snapshot is a JSON array. Anything else reads back as a miss.
//! - Snapshot writes never fail the caller; failures are logged and dropped.
//! - The cache is advisory: nothing read from it is ever written to the
//!   remote store.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::UserId;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type CacheResult<T> = Result<T, CacheError>;

/// Slot name for the training week tree.
pub const SLOT_WEEKS: &str = "weeks";
/// Slot name for diet meals with their substitutions.
pub const SLOT_DIET_MEALS: &str = "diet-meals";
/// Slot name for diet diary entries.
pub const SLOT_DIET_DIARY: &str = "diet-diary";
/// Slot name for the evolution routine tree.
pub const SLOT_EVOLUTION_WEEKS: &str = "evolution-weeks";
/// Slot name for evolution photos.
pub const SLOT_EVOLUTION_PHOTOS: &str = "evolution-photos";

/// Global (not user-scoped) key of the pre-sync training weeks list.
pub const LEGACY_WORKOUT_WEEKS_KEY: &str = "workout-weeks";

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    /// Cache backend rejected the operation.
    Unavailable(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "cache unavailable: {message}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Raw string slots keyed by name.
pub trait LocalCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CacheResult<()>;
    fn remove(&self, key: &str) -> CacheResult<()>;
}

/// Builds the per-user key for one snapshot slot.
pub fn cache_key(slot: &str, user_id: UserId) -> String {
    format!("{slot}-cache-{user_id}")
}

/// Key of the pre-sync evolution exercise list for one user.
pub fn legacy_evolution_exercises_key(user_id: UserId) -> String {
    format!("evolution-exercises-{user_id}")
}

/// Key of the pre-sync evolution photo list for one user.
pub fn legacy_evolution_photos_key(user_id: UserId) -> String {
    format!("evolution-photos-{user_id}")
}

/// Reads a snapshot array from `key`.
///
/// Missing slots, read failures, non-array blobs and arrays whose items do
/// not decode as `T` all return `None`.
pub fn load_snapshot<T: DeserializeOwned>(cache: &dyn LocalCache, key: &str) -> Option<Vec<T>> {
    let raw = match cache.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            debug!("event=cache_load module=cache status=error key={key} error={err}");
            return None;
        }
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            debug!("event=cache_load module=cache status=miss reason=malformed key={key} error={err}");
            return None;
        }
    };
    if !value.is_array() {
        debug!("event=cache_load module=cache status=miss reason=not_array key={key}");
        return None;
    }

    match serde_json::from_value::<Vec<T>>(value) {
        Ok(items) => {
            debug!(
                "event=cache_load module=cache status=hit key={} items={}",
                key,
                items.len()
            );
            Some(items)
        }
        Err(err) => {
            debug!("event=cache_load module=cache status=miss reason=shape key={key} error={err}");
            None
        }
    }
}

/// Writes a snapshot array to `key`, swallowing any failure.
pub fn store_snapshot<T: Serialize>(cache: &dyn LocalCache, key: &str, items: &[T]) {
    let encoded = match serde_json::to_string(items) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!("event=cache_store module=cache status=error reason=encode key={key} error={err}");
            return;
        }
    };
    if let Err(err) = cache.set(key, &encoded) {
        warn!("event=cache_store module=cache status=error key={key} error={err}");
    }
}

/// Cache slots persisted in the `local_kv` SQLite table.
pub struct SqliteLocalCache {
    conn: Connection,
}

impl SqliteLocalCache {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl LocalCache for SqliteLocalCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_kv WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.conn.execute(
            "INSERT INTO local_kv (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.conn
            .execute("DELETE FROM local_kv WHERE key = ?1;", params![key])?;
        Ok(())
    }
}

/// Session-only cache, useful in tests and for callers without a disk.
#[derive(Debug, Default)]
pub struct MemoryLocalCache {
    slots: RefCell<BTreeMap<String, String>>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored key, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.slots.borrow().keys().cloned().collect()
    }
}

impl LocalCache for MemoryLocalCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CacheResult<()> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}
