//! Session gate: the state machine that gates all data access on an
//! authenticated session.
//!
//! `Unresolved` → (`resolve`) → `Authenticated` or `Unauthenticated`.
//! Entering `Unauthenticated` — whether because no session exists, the auth
//! query failed, sign-out was invoked, or the backend revoked the session —
//! always fires the same side effect: a redirect to the login entry point.

use crate::service::{AuthService, Navigator};
use crate::types::Session;
use std::sync::Arc;

/// Lifecycle states of the authentication session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup state: the auth collaborator has not been queried yet.
    Unresolved,
    /// A live session exists; data access is permitted.
    Authenticated(Session),
    /// No session; the user has been redirected to the login entry point.
    Unauthenticated,
}

pub struct SessionGate {
    auth: Arc<dyn AuthService>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    state: SessionState,
}

impl SessionGate {
    pub fn new(
        auth: Arc<dyn AuthService>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            navigator,
            login_path: login_path.into(),
            state: SessionState::Unresolved,
        }
    }

    /// Query the auth collaborator for an existing session.
    ///
    /// The gate polls exactly once: calling `resolve` again after the state
    /// has settled returns the current session without another query.
    /// A resolution error is treated as "no session" — the user lands on
    /// the login page either way.
    pub async fn resolve(&mut self) -> Option<&Session> {
        if !matches!(self.state, SessionState::Unresolved) {
            return self.session();
        }

        match self.auth.get_session().await {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user_id, "Session resolved");
                self.state = SessionState::Authenticated(session);
            }
            Ok(None) => {
                tracing::info!("No existing session, redirecting to login");
                self.enter_unauthenticated();
            }
            Err(err) => {
                tracing::warn!(error = %err, "Session resolution failed, treating as signed out");
                self.enter_unauthenticated();
            }
        }
        self.session()
    }

    /// Sign out: invalidate the backend session and leave `Authenticated`.
    ///
    /// A sign-out error on the backend still transitions locally — the user
    /// asked to leave, and the redirect must happen regardless.
    pub async fn sign_out(&mut self) {
        if let Err(err) = self.auth.sign_out().await {
            tracing::warn!(error = %err, "Backend sign-out failed, transitioning anyway");
        }
        self.enter_unauthenticated();
    }

    /// React to an externally revoked session (e.g. a 401 observed by a
    /// fetch or mutation after the token expired server-side).
    pub fn revoke(&mut self) {
        if matches!(self.state, SessionState::Authenticated(_)) {
            tracing::warn!("Session revoked externally");
            self.enter_unauthenticated();
        }
    }

    fn enter_unauthenticated(&mut self) {
        self.state = SessionState::Unauthenticated;
        self.navigator.redirect(&self.login_path);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// Current session, or `None` in `Unresolved`/`Unauthenticated`.
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ServiceError, SignInRedirect};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeAuth {
        session: Option<Session>,
        fail_get: bool,
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
            if self.fail_get {
                return Err(ServiceError::Network("connection refused".into()));
            }
            Ok(self.session.clone())
        }

        async fn sign_in_with_provider(
            &self,
            _provider: &str,
            redirect_to: &str,
        ) -> Result<SignInRedirect, ServiceError> {
            Ok(SignInRedirect {
                url: redirect_to.to_string(),
            })
        }

        async fn sign_out(&self) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        redirects: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn redirect(&self, path: &str) {
            self.redirects.lock().unwrap().push(path.to_string());
        }
    }

    fn session() -> Session {
        Session {
            user_id: "u1".to_string(),
            email: "u1@example.com".to_string(),
        }
    }

    fn gate(auth: FakeAuth) -> (SessionGate, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        let gate = SessionGate::new(Arc::new(auth), navigator.clone(), "/");
        (gate, navigator)
    }

    #[tokio::test]
    async fn test_resolve_with_session_authenticates() {
        let (mut gate, navigator) = gate(FakeAuth {
            session: Some(session()),
            fail_get: false,
        });

        assert_eq!(*gate.state(), SessionState::Unresolved);
        let resolved = gate.resolve().await.cloned();

        assert_eq!(resolved.unwrap().user_id, "u1");
        assert!(gate.is_authenticated());
        assert!(navigator.redirects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_without_session_redirects() {
        let (mut gate, navigator) = gate(FakeAuth {
            session: None,
            fail_get: false,
        });

        assert!(gate.resolve().await.is_none());
        assert_eq!(*gate.state(), SessionState::Unauthenticated);
        assert_eq!(*navigator.redirects.lock().unwrap(), vec!["/".to_string()]);
    }

    #[tokio::test]
    async fn test_resolution_error_treated_as_signed_out() {
        let (mut gate, navigator) = gate(FakeAuth {
            session: None,
            fail_get: true,
        });

        assert!(gate.resolve().await.is_none());
        assert_eq!(*gate.state(), SessionState::Unauthenticated);
        assert_eq!(navigator.redirects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (mut gate, _navigator) = gate(FakeAuth {
            session: Some(session()),
            fail_get: false,
        });

        gate.resolve().await;
        // Second call must not re-query; state stays Authenticated.
        let resolved = gate.resolve().await.cloned();
        assert_eq!(resolved.unwrap().user_id, "u1");
    }

    #[tokio::test]
    async fn test_sign_out_redirects() {
        let (mut gate, navigator) = gate(FakeAuth {
            session: Some(session()),
            fail_get: false,
        });
        gate.resolve().await;

        gate.sign_out().await;

        assert_eq!(*gate.state(), SessionState::Unauthenticated);
        assert_eq!(navigator.redirects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_only_fires_from_authenticated() {
        let (mut gate, navigator) = gate(FakeAuth {
            session: Some(session()),
            fail_get: false,
        });

        // Revoke in Unresolved is a no-op.
        gate.revoke();
        assert_eq!(*gate.state(), SessionState::Unresolved);
        assert!(navigator.redirects.lock().unwrap().is_empty());

        gate.resolve().await;
        gate.revoke();
        assert_eq!(*gate.state(), SessionState::Unauthenticated);
        assert_eq!(navigator.redirects.lock().unwrap().len(), 1);
    }
}
