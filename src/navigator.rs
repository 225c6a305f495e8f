//! Navigation seam between the client core and whatever UI hosts it.

/// Route shown when a session cannot be recovered.
pub const LOGIN_PATH: &str = "/login";

/// Something that can move the user to another screen.
///
/// The client core calls this on unrecoverable auth failure; the guard calls
/// it for unauthenticated access. Implementations must not block.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless contexts: navigation requests are logged and
/// otherwise ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(%path, "navigation requested without a UI host");
    }
}
