//! SQLite-backed remote store.
//!
//! # Responsibility
//! - Implement [`RemoteStore`] over the generic `records` table.
//! - Enforce owner scoping, parent ownership and write-once columns.
//!
//! # Invariants
//! - Every statement filters on `table_name` and `user_id`.
//! - Deleting a row cascades through `parent_id` to every descendant.
//! - Selects return rows in creation order (`created_at`, then `rowid`).

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::{RecordId, UserId};
use crate::repo::remote_store::{
    Filter, RemoteStore, Row, StoreError, StoreResult, Table, COLUMN_CREATED_AT, COLUMN_ID,
    COLUMN_USER_ID,
};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row as SqlRow};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    parent_id,
    created_at,
    body
FROM records";

/// Remote store implementation persisting rows in SQLite.
pub struct SqliteRemoteStore {
    conn: Connection,
}

impl SqliteRemoteStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (and migrates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Counts rows of one table owned by `owner`.
    pub fn count(&self, table: Table, owner: UserId) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE table_name = ?1 AND user_id = ?2;",
            params![table.name(), owner.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Removes the parent column from `row`, validating the parent is an
    /// owned row of the parent table.
    fn take_parent(&self, table: Table, owner: UserId, row: &mut Row) -> StoreResult<Option<Uuid>> {
        let Some(link) = table.parent() else {
            return Ok(None);
        };

        let parent_id = row
            .remove(link.column)
            .and_then(|value| value.as_str().and_then(|text| Uuid::parse_str(text).ok()))
            .ok_or(StoreError::MissingParent {
                table,
                column: link.column,
            })?;

        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM records
                WHERE id = ?1 AND table_name = ?2 AND user_id = ?3
            );",
            params![
                parent_id.to_string(),
                link.table.name(),
                owner.to_string()
            ],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StoreError::UnknownParent { table, parent_id });
        }

        Ok(Some(parent_id))
    }

    fn load_required(&self, table: Table, id: RecordId, owner: UserId) -> StoreResult<Row> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE id = ?1 AND table_name = ?2 AND user_id = ?3;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), table.name(), owner.to_string()])?;
        match rows.next()? {
            Some(row) => parse_record_row(table, row),
            None => Err(StoreError::NotFound { table, id }),
        }
    }
}

impl RemoteStore for SqliteRemoteStore {
    fn select(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        let mut sql = format!("{RECORD_SELECT_SQL} WHERE table_name = ? AND user_id = ?");
        let mut bind_values = vec![
            SqlValue::Text(table.name().to_string()),
            SqlValue::Text(filter.owner.to_string()),
        ];

        if let Some(parents) = &filter.parent_in {
            if parents.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; parents.len()].join(", ");
            sql.push_str(&format!(" AND parent_id IN ({placeholders})"));
            bind_values.extend(parents.iter().map(|id| SqlValue::Text(id.to_string())));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_record_row(table, row)?);
        }
        Ok(items)
    }

    fn insert(&self, table: Table, owner: UserId, mut row: Row) -> StoreResult<Row> {
        row.remove(COLUMN_ID);
        row.remove(COLUMN_USER_ID);
        row.remove(COLUMN_CREATED_AT);
        let parent_id = self.take_parent(table, owner, &mut row)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO records (
                id,
                table_name,
                user_id,
                parent_id,
                created_at,
                body
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                table.name(),
                owner.to_string(),
                parent_id.map(|value| value.to_string()),
                now_epoch_ms(),
                serde_json::to_string(&row)?,
            ],
        )?;

        self.load_required(table, id, owner)
    }

    fn update(&self, table: Table, id: RecordId, owner: UserId, patch: &Row) -> StoreResult<()> {
        if let Some(column) = patch.keys().find(|key| table.is_immutable_column(key)) {
            return Err(StoreError::ImmutableColumn {
                table,
                column: column.clone(),
            });
        }

        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records
                 WHERE id = ?1 AND table_name = ?2 AND user_id = ?3;",
                params![id.to_string(), table.name(), owner.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let body = body.ok_or(StoreError::NotFound { table, id })?;

        let mut merged: Row = serde_json::from_str(&body)?;
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }

        self.conn.execute(
            "UPDATE records
             SET body = ?1
             WHERE id = ?2 AND table_name = ?3 AND user_id = ?4;",
            params![
                serde_json::to_string(&merged)?,
                id.to_string(),
                table.name(),
                owner.to_string()
            ],
        )?;
        Ok(())
    }

    fn delete(&self, table: Table, id: RecordId, owner: UserId) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM records
             WHERE id = ?1 AND table_name = ?2 AND user_id = ?3;",
            params![id.to_string(), table.name(), owner.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { table, id });
        }
        Ok(())
    }

    fn upsert(&self, table: Table, owner: UserId, mut row: Row) -> StoreResult<Row> {
        let id = row
            .remove(COLUMN_ID)
            .and_then(|value| value.as_str().and_then(|text| Uuid::parse_str(text).ok()))
            .ok_or_else(|| StoreError::InvalidRow(format!("{table} upsert requires an id")))?;
        let created_at = row
            .remove(COLUMN_CREATED_AT)
            .and_then(|value| value.as_i64())
            .unwrap_or_else(now_epoch_ms);
        row.remove(COLUMN_USER_ID);
        let parent_id = self.take_parent(table, owner, &mut row)?;

        // The WHERE clause turns a cross-owner conflict into a no-op.
        let changed = self.conn.execute(
            "INSERT INTO records (
                id,
                table_name,
                user_id,
                parent_id,
                created_at,
                body
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                parent_id = excluded.parent_id,
                created_at = excluded.created_at,
                body = excluded.body
            WHERE records.user_id = excluded.user_id
              AND records.table_name = excluded.table_name;",
            params![
                id.to_string(),
                table.name(),
                owner.to_string(),
                parent_id.map(|value| value.to_string()),
                created_at,
                serde_json::to_string(&row)?,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::OwnershipConflict { table, id });
        }

        self.load_required(table, id, owner)
    }
}

fn parse_record_row(table: Table, row: &SqlRow<'_>) -> StoreResult<Row> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let parent_id: Option<String> = row.get("parent_id")?;
    let created_at: i64 = row.get("created_at")?;
    let body: String = row.get("body")?;

    let mut parsed: Row = serde_json::from_str(&body).map_err(|err| {
        StoreError::InvalidRow(format!("invalid body for {table} row `{id}`: {err}"))
    })?;

    if let Some(link) = table.parent() {
        let parent_id = parent_id.ok_or_else(|| {
            StoreError::InvalidRow(format!("{table} row `{id}` has no parent"))
        })?;
        parsed.insert(link.column.to_string(), Value::String(parent_id));
    }
    parsed.insert(COLUMN_ID.to_string(), Value::String(id));
    parsed.insert(COLUMN_USER_ID.to_string(), Value::String(user_id));
    parsed.insert(COLUMN_CREATED_AT.to_string(), Value::from(created_at));
    Ok(parsed)
}

fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::SqliteRemoteStore;
    use crate::repo::remote_store::{Filter, RemoteStore, Row, StoreError, Table};
    use serde_json::json;
    use uuid::Uuid;

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("test rows are objects"),
        }
    }

    fn parent_id(row: &Row, column: &str) -> Uuid {
        Uuid::parse_str(row[column].as_str().unwrap()).unwrap()
    }

    #[test]
    fn insert_assigns_id_and_created_at_and_ignores_client_values() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let client_id = Uuid::new_v4();

        let inserted = store
            .insert(
                Table::Weeks,
                owner,
                row(json!({ "id": client_id.to_string(), "name": "Week 1", "created_at": 5 })),
            )
            .unwrap();

        assert_ne!(inserted["id"], json!(client_id.to_string()));
        assert_ne!(inserted["created_at"], json!(5));
        assert_eq!(inserted["user_id"], json!(owner.to_string()));
        assert_eq!(inserted["name"], json!("Week 1"));
    }

    #[test]
    fn insert_child_requires_owned_parent() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let week = store
            .insert(Table::Weeks, owner, row(json!({ "name": "Week 1" })))
            .unwrap();
        let week_id = week["id"].clone();

        let missing = store
            .insert(Table::Days, owner, row(json!({ "day_name": "Monday" })))
            .unwrap_err();
        assert!(matches!(missing, StoreError::MissingParent { .. }));

        let foreign = store
            .insert(
                Table::Days,
                intruder,
                row(json!({ "week_id": week_id, "day_name": "Monday" })),
            )
            .unwrap_err();
        assert!(matches!(foreign, StoreError::UnknownParent { .. }));

        let wrong_table = store
            .insert(
                Table::ExerciseSets,
                owner,
                row(json!({ "exercise_id": week["id"].clone(), "reps": 5 })),
            )
            .unwrap_err();
        assert!(matches!(wrong_table, StoreError::UnknownParent { .. }));
    }

    #[test]
    fn select_is_scoped_to_owner_and_parents() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let alice_week = store
            .insert(Table::Weeks, alice, row(json!({ "name": "A" })))
            .unwrap();
        let alice_other = store
            .insert(Table::Weeks, alice, row(json!({ "name": "A2" })))
            .unwrap();
        store
            .insert(Table::Weeks, bob, row(json!({ "name": "B" })))
            .unwrap();
        store
            .insert(
                Table::Days,
                alice,
                row(json!({ "week_id": alice_week["id"].clone(), "day_name": "Mon" })),
            )
            .unwrap();

        let weeks = store.select(Table::Weeks, &Filter::owned_by(alice)).unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0]["name"], json!("A"));

        let limited = store
            .select(Table::Weeks, &Filter::owned_by(alice).with_limit(1))
            .unwrap();
        assert_eq!(limited.len(), 1);

        let days = store
            .select(
                Table::Days,
                &Filter::owned_by(alice).with_parents([parent_id(&alice_other, "id")]),
            )
            .unwrap();
        assert!(days.is_empty());

        let none = store
            .select(Table::Days, &Filter::owned_by(alice).with_parents([]))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn update_merges_fields_and_rejects_immutable_columns() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let week = store
            .insert(
                Table::Weeks,
                owner,
                row(json!({ "name": "Week 1", "description": "base" })),
            )
            .unwrap();
        let week_id = parent_id(&week, "id");

        store
            .update(Table::Weeks, week_id, owner, &row(json!({ "name": "Deload" })))
            .unwrap();
        let loaded = store.select(Table::Weeks, &Filter::owned_by(owner)).unwrap();
        assert_eq!(loaded[0]["name"], json!("Deload"));
        assert_eq!(loaded[0]["description"], json!("base"));

        let err = store
            .update(Table::Weeks, week_id, owner, &row(json!({ "user_id": "x" })))
            .unwrap_err();
        assert!(matches!(err, StoreError::ImmutableColumn { .. }));

        let other = store
            .update(Table::Weeks, week_id, Uuid::new_v4(), &row(json!({ "name": "x" })))
            .unwrap_err();
        assert!(matches!(other, StoreError::NotFound { .. }));
    }

    #[test]
    fn delete_cascades_to_descendants() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let week = store
            .insert(Table::Weeks, owner, row(json!({ "name": "Week 1" })))
            .unwrap();
        let day = store
            .insert(
                Table::Days,
                owner,
                row(json!({ "week_id": week["id"].clone(), "day_name": "Mon" })),
            )
            .unwrap();
        store
            .insert(
                Table::Exercises,
                owner,
                row(json!({ "day_id": day["id"].clone(), "name": "Squat" })),
            )
            .unwrap();

        store
            .delete(Table::Weeks, parent_id(&week, "id"), owner)
            .unwrap();

        assert_eq!(store.count(Table::Days, owner).unwrap(), 0);
        assert_eq!(store.count(Table::Exercises, owner).unwrap(), 0);

        let again = store
            .delete(Table::Weeks, parent_id(&week, "id"), owner)
            .unwrap_err();
        assert!(matches!(again, StoreError::NotFound { .. }));
    }

    #[test]
    fn upsert_preserves_id_and_timestamp_and_refuses_foreign_rows() {
        let store = SqliteRemoteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let id = Uuid::new_v4();

        let first = store
            .upsert(
                Table::Weeks,
                owner,
                row(json!({ "id": id.to_string(), "name": "Old", "created_at": 1000 })),
            )
            .unwrap();
        assert_eq!(first["id"], json!(id.to_string()));
        assert_eq!(first["created_at"], json!(1000));

        let replaced = store
            .upsert(
                Table::Weeks,
                owner,
                row(json!({ "id": id.to_string(), "name": "New", "created_at": 1000 })),
            )
            .unwrap();
        assert_eq!(replaced["name"], json!("New"));
        assert_eq!(store.count(Table::Weeks, owner).unwrap(), 1);

        let err = store
            .upsert(
                Table::Weeks,
                Uuid::new_v4(),
                row(json!({ "id": id.to_string(), "name": "Stolen" })),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::OwnershipConflict { .. }));

        let missing_id = store
            .upsert(Table::Weeks, owner, row(json!({ "name": "No id" })))
            .unwrap_err();
        assert!(matches!(missing_id, StoreError::InvalidRow(_)));
    }
}
