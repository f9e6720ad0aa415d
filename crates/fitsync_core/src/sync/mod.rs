//! Collection synchronization infrastructure shared by every domain.
//!
//! # Responsibility
//! - Define the session and notification ports containers consume.
//! - Provide the normalized record arena and the shared lifecycle core.
//! - Run one-shot legacy migrations.
//!
//! # Invariants
//! - All calls are synchronous and single-threaded; the store and cache are
//!   the only places a call can block.
//! - Mutations are remote first; local state changes only after the store
//!   confirmed the write.

pub mod collection;
pub(crate) mod core;
pub mod error;
pub mod migration;
pub mod notify;
pub mod session;

pub use self::collection::Collection;
pub use self::core::{SyncDeps, SyncPhase};
pub use self::error::{SyncError, SyncResult};
pub use self::migration::{run_plan, MigrationError, MigrationPlan, MigrationStep};
pub use self::notify::{LogNotifier, Notifier, Severity};
pub use self::session::{SessionHandle, SessionProvider};
