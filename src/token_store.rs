//! Durable credential and cached-profile access.
//!
//! SYSTEM CONTEXT
//! ==============
//! Three entries live in the backend: access token, refresh token, cached
//! user. They are written and cleared as one group so a reader never sees
//! half a credential pair. No policy lives here; the session store and the
//! refresh protocol decide when to write.

use std::sync::Arc;

use tracing::debug;

use crate::storage::{NoopStorage, StorageBackend};
use crate::types::User;

pub const ACCESS_TOKEN_KEY: &str = "kilat_access_token";
pub const REFRESH_TOKEN_KEY: &str = "kilat_refresh_token";
pub const USER_KEY: &str = "kilat_user";

/// Handle to the persisted credentials. Cheap to clone; clones share the
/// same backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn StorageBackend>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Store with no persistence at all.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Arc::new(NoopStorage))
    }

    /// Persist a credential pair in one write.
    pub fn save(&self, access_token: &str, refresh_token: &str) {
        self.backend
            .set_items(&[(ACCESS_TOKEN_KEY, access_token), (REFRESH_TOKEN_KEY, refresh_token)]);
    }

    /// Persist a credential pair and the matching profile in one write, so
    /// a reader never pairs new tokens with a previous user.
    pub fn save_session(&self, access_token: &str, refresh_token: &str, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.backend.set_items(&[
                (ACCESS_TOKEN_KEY, access_token),
                (REFRESH_TOKEN_KEY, refresh_token),
                (USER_KEY, &raw),
            ]),
            Err(e) => {
                debug!(error = %e, "cached user serialization failed; dropping stale profile");
                self.backend.remove_item(USER_KEY);
                self.save(access_token, refresh_token);
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.backend.get_item(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.backend.get_item(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Remove tokens and the cached user together.
    pub fn clear(&self) {
        self.backend.remove_items(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY]);
    }

    pub fn save_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.backend.set_item(USER_KEY, &raw),
            Err(e) => debug!(error = %e, "cached user serialization failed"),
        }
    }

    /// Cached user profile. Malformed data reads as `None`.
    pub fn user(&self) -> Option<User> {
        let raw = self.backend.get_item(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "cached user is malformed; ignoring");
                None
            }
        }
    }

    /// Whether an access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;
