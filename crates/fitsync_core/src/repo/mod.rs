//! Persistence adapters: the remote record store and the local cache.
//!
//! # Responsibility
//! - Define the store/cache contracts sync containers are written against.
//! - Provide SQLite and in-memory implementations of those contracts.
//!
//! # Invariants
//! - Store calls are always scoped by the owning user.
//! - Store APIs return semantic errors (`NotFound`, `UnknownParent`) in
//!   addition to DB transport errors.

pub mod local_cache;
pub mod remote_store;
pub mod sqlite_store;
