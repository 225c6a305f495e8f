//! Auth-session state for the current seller.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and user-aware commands read the session through
//! [`AuthStore::get`] or subscribe to changes with [`AuthStore::subscribe`].
//! The session is a projection of the token store and can always be rebuilt
//! from it with [`AuthStore::hydrate`].
//!
//! DESIGN
//! ======
//! Backed by a `tokio::sync::watch` channel. Writers publish only when the
//! session value actually changes, so a repeated `hydrate()` over unchanged
//! storage does not wake subscribers.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::token_store::TokenStore;
use crate::types::{AuthResponse, User};

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// `true` until the first `hydrate()` completes.
    pub is_loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self { user: None, is_authenticated: false, is_loading: true }
    }
}

/// Process-wide session store. Clones share state and subscribers.
#[derive(Clone)]
pub struct AuthStore {
    tokens: TokenStore,
    state: Arc<watch::Sender<Session>>,
}

impl AuthStore {
    pub fn new(tokens: TokenStore) -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { tokens, state: Arc::new(tx) }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Snapshot of the current session.
    pub fn get(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every subsequent session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Persist a fresh login/registration and mark the session authenticated.
    pub fn set_auth(&self, auth: &AuthResponse) {
        self.tokens.save_session(&auth.access_token, &auth.refresh_token, &auth.user);
        info!(user_id = %auth.user.id, "session established");
        self.publish(|s| {
            s.user = Some(auth.user.clone());
            s.is_authenticated = true;
        });
    }

    /// Drop all credentials. Safe to call when already logged out.
    pub fn logout(&self) {
        self.tokens.clear();
        self.publish(|s| {
            s.user = None;
            s.is_authenticated = false;
        });
    }

    /// Rebuild the session from storage and leave the loading state.
    pub fn hydrate(&self) {
        let has_token = self.tokens.access_token().is_some();
        let user = if has_token { self.tokens.user() } else { None };
        self.publish(|s| {
            s.is_authenticated = user.is_some();
            s.user = user;
            s.is_loading = false;
        });
    }

    /// Replace the cached profile after the server confirmed an edit.
    pub fn update_user(&self, user: User) {
        self.tokens.save_user(&user);
        self.publish(|s| {
            if s.is_authenticated {
                s.user = Some(user);
            }
        });
    }

    fn publish(&self, apply: impl FnOnce(&mut Session)) {
        self.state.send_if_modified(|current| {
            let mut next = current.clone();
            apply(&mut next);
            if next == *current {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore").field("session", &*self.state.borrow()).finish()
    }
}
