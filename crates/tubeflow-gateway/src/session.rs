//! Session context for authenticated backend calls.
//!
//! The session is created once at application start, handed to the gateway,
//! and cleared on logout. Any 401 from the backend clears it and notifies the
//! registered [`UnauthorizedHandler`].

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

/// Invoked when the backend rejects the session credential.
///
/// Implementations perform the logout side of the flow, e.g. redirecting the
/// user to the login screen.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self, operation: &str);
}

/// Handler that only logs. Used when the host has no redirect to perform.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyHandler;

impl UnauthorizedHandler for LogOnlyHandler {
    fn on_unauthorized(&self, operation: &str) {
        warn!(operation = %operation, "Session rejected by backend, login required");
    }
}

impl<F> UnauthorizedHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_unauthorized(&self, operation: &str) {
        self(operation)
    }
}

#[derive(Default)]
struct SessionInner {
    token: Option<String>,
}

/// Process-wide session holding the bearer credential.
///
/// Cloning shares the same underlying state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<RwLock<SessionInner>>,
    on_unauthorized: Arc<dyn UnauthorizedHandler>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(LogOnlyHandler)
    }
}

impl Session {
    /// Create an empty session with the given logout handler.
    pub fn new(handler: impl UnauthorizedHandler + 'static) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner::default())),
            on_unauthorized: Arc::new(handler),
        }
    }

    /// Create a session that starts authenticated.
    pub fn initialize(token: impl Into<String>, handler: impl UnauthorizedHandler + 'static) -> Self {
        let session = Self::new(handler);
        session.set(token);
        session
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    /// Store a new credential. Blank tokens clear the session.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut inner = self.inner.write();
        if token.trim().is_empty() {
            inner.token = None;
        } else {
            inner.token = Some(token);
        }
    }

    /// Drop the credential (logout).
    pub fn clear(&self) {
        self.inner.write().token = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().token.is_some()
    }

    /// Clear the credential and run the logout handler.
    ///
    /// Called by the gateway for every 401 response.
    pub fn expire(&self, operation: &str) {
        self.clear();
        info!(operation = %operation, "Session cleared after unauthorized response");
        self.on_unauthorized.on_unauthorized(operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_session_lifecycle() {
        let session = Session::default();
        assert!(!session.is_authenticated());

        session.set("jwt-1");
        assert_eq!(session.get().as_deref(), Some("jwt-1"));

        session.clear();
        assert!(session.get().is_none());
    }

    #[test]
    fn test_blank_token_clears() {
        let session = Session::initialize("jwt-1", LogOnlyHandler);
        session.set("   ");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::default();
        let other = session.clone();
        session.set("jwt-2");
        assert_eq!(other.get().as_deref(), Some("jwt-2"));
    }

    #[test]
    fn test_expire_runs_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let session = Session::initialize("jwt-3", move |_op: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        session.expire("save_title");
        assert!(!session.is_authenticated());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
