mod common;

use common::row;
use fitsync_core::model::training::WeekDraft;
use fitsync_core::repo::local_cache::{cache_key, SLOT_WEEKS};
use fitsync_core::{
    Filter, LocalCache, LogNotifier, RemoteStore, SessionHandle, SqliteLocalCache,
    SqliteRemoteStore, StoreError, SyncDeps, Table, WeekSync,
};
use serde_json::json;
use std::rc::Rc;
use uuid::Uuid;

#[test]
fn rows_of_one_user_are_invisible_to_another() {
    let store = SqliteRemoteStore::open_in_memory().unwrap();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let week = store
        .insert(Table::Weeks, alice, row(json!({ "name": "Alice week" })))
        .unwrap();
    let week_id = Uuid::parse_str(week["id"].as_str().unwrap()).unwrap();

    assert!(store
        .select(Table::Weeks, &Filter::owned_by(bob))
        .unwrap()
        .is_empty());
    let err = store
        .update(Table::Weeks, week_id, bob, &row(json!({ "name": "hijacked" })))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    let err = store.delete(Table::Weeks, week_id, bob).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let err = store
        .insert(
            Table::Days,
            bob,
            row(json!({ "week_id": week_id, "date": "2024-01-01", "day_name": "Mon" })),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownParent { .. }));

    let err = store
        .upsert(Table::Weeks, bob, row(json!({ "id": week_id, "name": "taken" })))
        .unwrap_err();
    assert!(matches!(err, StoreError::OwnershipConflict { .. }));

    let rows = store.select(Table::Weeks, &Filter::owned_by(alice)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Alice week"));
}

#[test]
fn week_tree_survives_a_restart_on_sqlite_files() {
    let dir = tempfile::tempdir().unwrap();
    let remote_path = dir.path().join("remote.sqlite3");
    let cache_path = dir.path().join("cache.sqlite3");
    let user = Uuid::new_v4();

    let deps = |session: Rc<SessionHandle>| {
        SyncDeps::new(
            session,
            Rc::new(SqliteRemoteStore::open(&remote_path).unwrap()),
            Rc::new(SqliteLocalCache::open(&cache_path).unwrap()),
            Rc::new(LogNotifier),
        )
    };

    let first_tree = {
        let mut sync = WeekSync::new(deps(Rc::new(SessionHandle::signed_in(user))));
        sync.initialize().unwrap();
        sync.add_week(WeekDraft {
            name: "Base block".to_string(),
            description: None,
        })
        .unwrap();
        sync.tree()
    };

    let cache = SqliteLocalCache::open(&cache_path).unwrap();
    assert!(cache.get(&cache_key(SLOT_WEEKS, user)).unwrap().is_some());
    assert_eq!(cache.get(&cache_key(SLOT_WEEKS, Uuid::new_v4())).unwrap(), None);

    let mut sync = WeekSync::new(deps(Rc::new(SessionHandle::signed_in(user))));
    assert!(sync.begin());
    assert_eq!(sync.tree(), first_tree);
    sync.reconcile().unwrap();
    assert_eq!(sync.tree(), first_tree);
}
