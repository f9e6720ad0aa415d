//! Core data layer for FitSync.
//! This crate is the single source of truth for record ownership, sync
//! ordering and cache convergence.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{legacy_record_id, normalize_calendar_date, Record, RecordId, UserId};
pub use repo::local_cache::{
    CacheError, CacheResult, LocalCache, MemoryLocalCache, SqliteLocalCache,
};
pub use repo::remote_store::{Filter, RemoteStore, Row, StoreError, StoreResult, Table};
pub use repo::sqlite_store::SqliteRemoteStore;
pub use service::diet_service::DietSync;
pub use service::evolution_service::EvolutionSync;
pub use service::week_service::WeekSync;
pub use sync::{
    LogNotifier, Notifier, SessionHandle, SessionProvider, Severity, SyncDeps, SyncError,
    SyncPhase, SyncResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
