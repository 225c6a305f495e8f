//! Gate for protected views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected command applies the same unauthenticated redirect: wait
//! for the session to finish loading, then either proceed or send the user
//! to `/login`. Nothing redirects while the session is still loading.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::navigator::{LOGIN_PATH, Navigator};
use crate::session::{AuthStore, Session};
use crate::types::User;

/// What a protected view should show for a given session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardView {
    /// Session not hydrated yet; show a placeholder and do not redirect.
    Placeholder,
    /// Loaded and unauthenticated; redirect and render nothing further.
    Redirect,
    /// Loaded and authenticated.
    Protected(User),
}

/// Pure decision over one session snapshot.
#[must_use]
pub fn evaluate(session: &Session) -> GuardView {
    if session.is_loading {
        return GuardView::Placeholder;
    }
    match (&session.user, session.is_authenticated) {
        (Some(user), true) => GuardView::Protected(user.clone()),
        _ => GuardView::Redirect,
    }
}

pub struct AuthGuard {
    store: AuthStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthGuard {
    pub fn new(store: AuthStore, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Hydrate the session the way a layout mount does.
    pub fn mount(&self) {
        self.store.hydrate();
    }

    /// Current decision without side effects.
    #[must_use]
    pub fn view(&self) -> GuardView {
        evaluate(&self.store.get())
    }

    /// Wait for loading to finish, redirect if unauthenticated, and return
    /// the settled decision.
    pub async fn resolve(&self) -> GuardView {
        let mut rx = self.store.subscribe();
        let view = match rx.wait_for(|s| !s.is_loading).await {
            Ok(session) => evaluate(&session),
            // Store dropped while loading: nothing left to protect.
            Err(_) => GuardView::Redirect,
        };
        if view == GuardView::Redirect {
            self.navigator.navigate(LOGIN_PATH);
        }
        view
    }

    /// Keep watching the session and redirect every time it settles into the
    /// unauthenticated state (logout, failed refresh). The task ends when
    /// the store is dropped or the handle is aborted.
    pub fn spawn_redirect(&self) -> JoinHandle<()> {
        let mut rx = self.store.subscribe();
        let navigator = self.navigator.clone();
        tokio::spawn(async move {
            let mut last = evaluate(&rx.borrow_and_update());
            if last == GuardView::Redirect {
                navigator.navigate(LOGIN_PATH);
            }
            while rx.changed().await.is_ok() {
                let next = evaluate(&rx.borrow_and_update());
                if next == GuardView::Redirect && last != GuardView::Redirect {
                    debug!("session lost; redirecting to login");
                    navigator.navigate(LOGIN_PATH);
                }
                last = next;
            }
        })
    }
}

impl std::fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard").field("view", &self.view()).finish_non_exhaustive()
    }
}
