//! Authenticated session source consumed by sync containers.

use crate::model::UserId;
use std::cell::Cell;

/// Supplies the currently authenticated user, if any.
///
/// Containers read this at initialization and before every mutation. After
/// the answer changes, callers must invoke `on_auth_state_changed` on each
/// container.
pub trait SessionProvider {
    fn current_user(&self) -> Option<UserId>;
}

/// Mutable in-process session, set by whatever drives authentication.
#[derive(Debug, Default)]
pub struct SessionHandle {
    user: Cell<Option<UserId>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user: Cell::new(Some(user_id)),
        }
    }

    pub fn sign_in(&self, user_id: UserId) {
        self.user.set(Some(user_id));
    }

    pub fn sign_out(&self) {
        self.user.set(None);
    }
}

impl SessionProvider for SessionHandle {
    fn current_user(&self) -> Option<UserId> {
        self.user.get()
    }
}
