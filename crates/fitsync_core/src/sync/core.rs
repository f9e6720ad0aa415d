//! Shared container plumbing: injected collaborators, lifecycle phase, and
//! outcome reporting.
//!
//! # Responsibility
//! - Track which user a container was initialized for and where it is in
//!   the `Unauthenticated -> Hydrating -> Reconciling -> Ready` cycle.
//! - Turn mutation outcomes into exactly one notification.
//! - Drive the legacy migration step once a plan has been built.
//!
//! # Invariants
//! - `NotAuthenticated` outcomes never notify.
//! - Legacy blobs are removed only after every migration step succeeded.

use crate::model::UserId;
use crate::repo::local_cache::LocalCache;
use crate::repo::remote_store::{Filter, RemoteStore, StoreResult, Table};
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::migration::{run_plan, MigrationError, MigrationPlan};
use crate::sync::notify::{Notifier, Severity};
use crate::sync::session::SessionProvider;
use log::{debug, info, warn};
use std::rc::Rc;

/// Collaborators every container is constructed with.
#[derive(Clone)]
pub struct SyncDeps {
    pub session: Rc<dyn SessionProvider>,
    pub store: Rc<dyn RemoteStore>,
    pub cache: Rc<dyn LocalCache>,
    pub notifier: Rc<dyn Notifier>,
}

impl SyncDeps {
    pub fn new(
        session: Rc<dyn SessionProvider>,
        store: Rc<dyn RemoteStore>,
        cache: Rc<dyn LocalCache>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            store,
            cache,
            notifier,
        }
    }
}

/// Initialization phase of one container for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No user; the tree is empty until a user signs in.
    Unauthenticated,
    /// Reading the cache slot.
    Hydrating,
    /// Fetching (and possibly migrating) from the remote store.
    Reconciling,
    /// Tree reflects the last successful fetch or mutation.
    Ready,
}

pub(crate) struct SyncCore {
    deps: SyncDeps,
    module: &'static str,
    user: Option<UserId>,
    phase: SyncPhase,
    loading: bool,
}

impl SyncCore {
    pub(crate) fn new(deps: SyncDeps, module: &'static str) -> Self {
        Self {
            deps,
            module,
            user: None,
            phase: SyncPhase::Unauthenticated,
            loading: false,
        }
    }

    pub(crate) fn store(&self) -> &dyn RemoteStore {
        self.deps.store.as_ref()
    }

    pub(crate) fn cache(&self) -> &dyn LocalCache {
        self.deps.cache.as_ref()
    }

    pub(crate) fn user(&self) -> Option<UserId> {
        self.user
    }

    pub(crate) fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    /// Re-reads the session and enters `Hydrating`, or `Unauthenticated`
    /// when nobody is signed in.
    pub(crate) fn begin_session(&mut self) -> Option<UserId> {
        self.user = self.deps.session.current_user();
        match self.user {
            Some(user) => {
                self.phase = SyncPhase::Hydrating;
                self.loading = true;
                debug!(
                    "event=sync_init module={} status=start user_id={}",
                    self.module, user
                );
            }
            None => {
                self.phase = SyncPhase::Unauthenticated;
                self.loading = false;
                debug!(
                    "event=sync_init module={} status=skipped reason=unauthenticated",
                    self.module
                );
            }
        }
        self.user
    }

    /// Cache delivered a usable tree; stop showing the loading state.
    pub(crate) fn mark_hydrated(&mut self) {
        self.loading = false;
    }

    pub(crate) fn start_reconcile(&mut self) -> SyncResult<UserId> {
        let user = self.user.ok_or(SyncError::NotAuthenticated)?;
        self.phase = SyncPhase::Reconciling;
        Ok(user)
    }

    /// Ends a reconcile pass. On failure the previous tree is kept and the
    /// user is told once.
    pub(crate) fn finish_reconcile(&mut self, outcome: &SyncResult<()>, failure_message: &str) {
        self.phase = SyncPhase::Ready;
        self.loading = false;
        match outcome {
            Ok(()) => info!("event=sync_fetch module={} status=ok", self.module),
            Err(err) => {
                warn!(
                    "event=sync_fetch module={} status=error error={}",
                    self.module, err
                );
                self.notify(failure_message, Severity::Error);
            }
        }
    }

    /// User every mutation must be scoped to.
    ///
    /// The session must still report the user this container was initialized
    /// for; otherwise the in-memory tree belongs to someone else.
    pub(crate) fn require_user(&self) -> SyncResult<UserId> {
        match (self.user, self.deps.session.current_user()) {
            (Some(loaded), Some(current)) if loaded == current => Ok(current),
            _ => Err(SyncError::NotAuthenticated),
        }
    }

    pub(crate) fn has_remote_roots(&self, table: Table, user: UserId) -> StoreResult<bool> {
        let rows = self
            .store()
            .select(table, &Filter::owned_by(user).with_limit(1))?;
        Ok(!rows.is_empty())
    }

    /// Publishes the outcome of one mutation attempt and passes it through.
    pub(crate) fn report<T>(
        &self,
        op: &'static str,
        outcome: SyncResult<T>,
        success_message: &str,
        failure_message: &str,
    ) -> SyncResult<T> {
        match &outcome {
            Ok(_) => {
                info!(
                    "event=sync_mutation module={} op={} status=ok",
                    self.module, op
                );
                self.notify(success_message, Severity::Success);
            }
            Err(SyncError::NotAuthenticated) => {
                debug!(
                    "event=sync_mutation module={} op={} status=skipped reason=unauthenticated",
                    self.module, op
                );
            }
            Err(err) => {
                warn!(
                    "event=sync_mutation module={} op={} status=error error={}",
                    self.module, op, err
                );
                self.notify(failure_message, Severity::Error);
            }
        }
        outcome
    }

    pub(crate) fn notify(&self, message: &str, severity: Severity) {
        self.deps.notifier.notify(message, severity);
    }

    /// Reads a raw legacy blob; read failures count as absent.
    pub(crate) fn read_legacy(&self, key: &str) -> Option<String> {
        match self.cache().get(key) {
            Ok(value) => value,
            Err(err) => {
                debug!(
                    "event=legacy_read module={} status=error key={} error={}",
                    self.module, key, err
                );
                None
            }
        }
    }

    /// Runs a prepared legacy plan. `Ok(None)` means there was nothing to
    /// migrate. Returns whether a migration completed.
    ///
    /// Callers only get here while the user has no remote root records. A
    /// plan that fails after its first root upsert leaves that root behind,
    /// so later passes skip the migration and the legacy keys stay in the
    /// cache untouched. Only a failure on the first root step is retried.
    pub(crate) fn apply_legacy_migration(
        &self,
        user: UserId,
        prepared: Result<Option<MigrationPlan>, MigrationError>,
        legacy_keys: &[String],
    ) -> bool {
        let plan = match prepared {
            Ok(Some(plan)) => plan,
            Ok(None) => return false,
            Err(err) => {
                warn!(
                    "event=legacy_migration module={} status=error error={}",
                    self.module, err
                );
                self.notify("Failed to migrate local data", Severity::Error);
                return false;
            }
        };

        info!(
            "event=legacy_migration module={} status=start steps={}",
            self.module,
            plan.len()
        );
        match run_plan(self.store(), user, &plan) {
            Ok(_) => {
                for key in legacy_keys {
                    if let Err(err) = self.cache().remove(key) {
                        warn!(
                            "event=legacy_cleanup module={} status=error key={} error={}",
                            self.module, key, err
                        );
                    }
                }
                self.notify("Local data migrated", Severity::Success);
                true
            }
            Err(_) => {
                self.notify("Failed to migrate local data", Severity::Error);
                false
            }
        }
    }
}
