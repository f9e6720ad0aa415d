#![allow(dead_code)]

use fitsync_core::{
    Filter, MemoryLocalCache, Notifier, RemoteStore, Row, SessionHandle, Severity,
    SqliteRemoteStore, StoreError, StoreResult, SyncDeps, Table, UserId,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub table: Table,
    pub owner: UserId,
}

/// In-memory SQLite store that records calls and can fail or stall on cue.
pub struct ScriptedStore {
    inner: SqliteRemoteStore,
    calls: RefCell<Vec<StoreCall>>,
    /// Pending failures: the op and how many of its calls still succeed first.
    queued_failures: RefCell<Vec<(StoreOp, u32)>>,
    offline: Cell<bool>,
    latency: Cell<Duration>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteRemoteStore::open_in_memory().unwrap(),
            calls: RefCell::new(Vec::new()),
            queued_failures: RefCell::new(Vec::new()),
            offline: Cell::new(false),
            latency: Cell::new(Duration::ZERO),
        }
    }

    /// Direct access that bypasses recording, failures and latency.
    pub fn inner(&self) -> &SqliteRemoteStore {
        &self.inner
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.op != StoreOp::Select)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Makes the next call of `op` fail once.
    pub fn fail_next(&self, op: StoreOp) {
        self.fail_after(op, 0);
    }

    /// Lets `successes` calls of `op` through, then fails the next one.
    pub fn fail_after(&self, op: StoreOp, successes: u32) {
        self.queued_failures.borrow_mut().push((op, successes));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency.set(latency);
    }

    fn enter(&self, op: StoreOp, table: Table, owner: UserId) -> StoreResult<()> {
        self.calls.borrow_mut().push(StoreCall { op, table, owner });
        let latency = self.latency.get();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        if self.offline.get() {
            return Err(StoreError::Unavailable("offline".to_string()));
        }
        let mut queued = self.queued_failures.borrow_mut();
        if let Some(index) = queued.iter().position(|(queued_op, _)| *queued_op == op) {
            if queued[index].1 == 0 {
                queued.remove(index);
                return Err(StoreError::Unavailable(format!("injected {op:?} failure")));
            }
            queued[index].1 -= 1;
        }
        Ok(())
    }
}

impl RemoteStore for ScriptedStore {
    fn select(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        self.enter(StoreOp::Select, table, filter.owner)?;
        self.inner.select(table, filter)
    }

    fn insert(&self, table: Table, owner: UserId, row: Row) -> StoreResult<Row> {
        self.enter(StoreOp::Insert, table, owner)?;
        self.inner.insert(table, owner, row)
    }

    fn update(&self, table: Table, id: Uuid, owner: UserId, patch: &Row) -> StoreResult<()> {
        self.enter(StoreOp::Update, table, owner)?;
        self.inner.update(table, id, owner, patch)
    }

    fn delete(&self, table: Table, id: Uuid, owner: UserId) -> StoreResult<()> {
        self.enter(StoreOp::Delete, table, owner)?;
        self.inner.delete(table, id, owner)
    }

    fn upsert(&self, table: Table, owner: UserId, row: Row) -> StoreResult<Row> {
        self.enter(StoreOp::Upsert, table, owner)?;
        self.inner.upsert(table, owner, row)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn severities(&self) -> Vec<Severity> {
        self.messages
            .borrow()
            .iter()
            .map(|(_, severity)| *severity)
            .collect()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .borrow_mut()
            .push((message.to_string(), severity));
    }
}

/// One signed-in user with fresh fakes for every collaborator.
pub struct Harness {
    pub user: UserId,
    pub session: Rc<SessionHandle>,
    pub store: Rc<ScriptedStore>,
    pub cache: Rc<MemoryLocalCache>,
    pub notifier: Rc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        let user = Uuid::new_v4();
        Self {
            user,
            session: Rc::new(SessionHandle::signed_in(user)),
            store: Rc::new(ScriptedStore::new()),
            cache: Rc::new(MemoryLocalCache::new()),
            notifier: Rc::new(RecordingNotifier::default()),
        }
    }

    pub fn deps(&self) -> SyncDeps {
        SyncDeps::new(
            self.session.clone(),
            self.store.clone(),
            self.cache.clone(),
            self.notifier.clone(),
        )
    }

    /// Forgets calls and notifications recorded so far.
    pub fn reset_observations(&self) {
        self.store.clear_calls();
        self.notifier.clear();
    }

    pub fn assert_all_calls_scoped_to(&self, user: UserId) {
        for call in self.store.calls() {
            assert_eq!(call.owner, user, "unscoped store call: {call:?}");
        }
    }
}

pub fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a json object, got {other}"),
    }
}
