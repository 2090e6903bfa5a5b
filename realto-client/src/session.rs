//! Session lifecycle
//!
//! Owns the current-user state (token + profile) and coordinates the token
//! vault with the current-user endpoints. The manager is constructed once by
//! the application's composition root and passed to whatever needs it; there
//! is no ambient global. Mutating operations are serialized through a single
//! operation lock, so a login racing a logout cannot interleave.

use async_trait::async_trait;
use realto_core::{Credentials, RealtoResult, Session, UserProfile, UserRole};
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::http::{LoginPayload, Navigator, OnUnauthorized};
use crate::storage::TokenVault;

/// Shared handle to the one live [`Session`]
///
/// Reads are lock-free from the caller's perspective; mutation goes through
/// the session manager.
#[derive(Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.read().unwrap().clone()
    }

    pub fn token(&self) -> String {
        self.inner.read().unwrap().token.clone()
    }

    pub fn profile(&self) -> UserProfile {
        self.inner.read().unwrap().user.clone()
    }

    pub fn roles(&self) -> Vec<UserRole> {
        self.inner.read().unwrap().user.roles.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().unwrap().is_authenticated()
    }

    pub fn replace(&self, session: Session) {
        *self.inner.write().unwrap() = session;
    }

    pub(crate) fn set_token(&self, token: String) {
        self.inner.write().unwrap().token = token;
    }
}

/// Session transitions announced to interested UI layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
}

/// The current-user endpoints the session manager depends on
///
/// Implemented by the HTTP endpoint group and by stubs in tests.
#[async_trait]
pub trait CurrentUserGateway: Send + Sync {
    async fn fetch_self(&self) -> RealtoResult<UserProfile>;

    async fn login(&self, credentials: &Credentials) -> RealtoResult<LoginPayload>;

    async fn logout(&self) -> RealtoResult<()>;
}

/// Owner of the session lifecycle
pub struct SessionManager {
    state: SessionState,
    vault: TokenVault,
    gateway: Arc<dyn CurrentUserGateway>,
    op_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        state: SessionState,
        vault: TokenVault,
        gateway: Arc<dyn CurrentUserGateway>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);

        Self {
            state,
            vault,
            gateway,
            op_lock: Mutex::new(()),
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn token(&self) -> String {
        self.state.token()
    }

    pub fn profile(&self) -> UserProfile {
        self.state.profile()
    }

    pub fn roles(&self) -> Vec<UserRole> {
        self.state.roles()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Restore a prior session from the token stores.
    ///
    /// A missing or unreadable token is a silent "no prior session" outcome,
    /// not a failure; the same goes for a failed profile fetch, which also
    /// drops the stored token. Either way the caller gets a well-defined
    /// session back.
    pub async fn restore(&self) -> RealtoResult<Session> {
        let _guard = self.op_lock.lock().await;

        let token = match self.vault.load().await {
            Ok(token) => token,
            Err(error) => {
                debug!(error = %error, "No prior session to restore");
                self.state.replace(Session::default());
                return Ok(self.state.snapshot());
            }
        };

        // The interceptor reads the token from the shared state, so it must
        // be visible before the profile fetch goes out.
        self.state.set_token(token);

        match self.gateway.fetch_self().await {
            Ok(user) => {
                let session = Session::new(self.state.token(), user);
                self.state.replace(session.clone());
                let _ = self.events.send(SessionEvent::LoggedIn);

                info!(user = %session.user.email, "Session restored");
                Ok(session)
            }
            Err(error) => {
                warn!(error = %error, "Profile fetch failed, dropping stored token");

                if let Err(clear_error) = self.vault.clear().await {
                    warn!(error = %clear_error, "Failed to clear stored token");
                }

                self.state.replace(Session::default());
                Ok(self.state.snapshot())
            }
        }
    }

    /// Log in and persist the returned token according to `durable`.
    ///
    /// HTTP failures surface unchanged. A token that cannot be persisted is
    /// a failed login from the client's point of view even though the server
    /// accepted the credentials: the in-memory session is reset and the
    /// storage error is surfaced.
    pub async fn login(
        &self,
        credentials: &Credentials,
        durable: bool,
    ) -> RealtoResult<UserProfile> {
        let _guard = self.op_lock.lock().await;

        let payload = self.gateway.login(credentials).await?;

        match self.vault.save(&payload.token, durable).await {
            Ok(token) => {
                self.state.replace(Session::new(token, payload.user.clone()));
                let _ = self.events.send(SessionEvent::LoggedIn);

                info!(user = %payload.user.email, durable, "Logged in");
                Ok(payload.user)
            }
            Err(error) => {
                self.state.replace(Session::default());
                Err(error)
            }
        }
    }

    /// Log out. The server request is fire-and-forget: whatever its outcome,
    /// the stored token is cleared and the session reset, so the client
    /// always ends up logged out.
    pub async fn logout(&self) -> RealtoResult<()> {
        let _guard = self.op_lock.lock().await;

        if let Err(error) = self.gateway.logout().await {
            warn!(error = %error, "Logout request failed, clearing local session anyway");
        }

        self.expire().await;
        Ok(())
    }

    /// Drop the local session: clear both token stores and reset the
    /// in-memory session. Used by logout and by the forced-logout path when
    /// the server has already rejected the token.
    ///
    /// Must not take the operation lock: it runs inside requests issued
    /// while that lock is held.
    pub async fn expire(&self) {
        if let Err(error) = self.vault.clear().await {
            warn!(error = %error, "Failed to clear token stores");
        }

        self.state.replace(Session::default());
        let _ = self.events.send(SessionEvent::LoggedOut);
    }
}

/// Forced-logout side effect installed on the interceptor by the
/// composition root: drops the local session, then sends the user to the
/// login route. Runs once per 401; its own outcome never alters the
/// original error.
pub struct ForcedLogout {
    manager: Weak<SessionManager>,
    navigator: Arc<dyn Navigator>,
}

impl ForcedLogout {
    pub fn new(manager: &Arc<SessionManager>, navigator: Arc<dyn Navigator>) -> Arc<Self> {
        Arc::new(Self {
            manager: Arc::downgrade(manager),
            navigator,
        })
    }
}

#[async_trait]
impl OnUnauthorized for ForcedLogout {
    async fn on_unauthorized(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.expire().await;
        }

        self.navigator.to_login();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryTokenStore, TokenStore};
    use realto_core::{ErrorContext, RealtoError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubGateway {
        token: String,
        roles: Vec<&'static str>,
        fail_fetch_self: bool,
        fail_logout: bool,
        logout_calls: AtomicUsize,
    }

    impl StubGateway {
        fn network_error(message: &str) -> RealtoError {
            RealtoError::Network {
                message: message.to_string(),
                status: Some(500),
                source: None,
                context: ErrorContext::new("stub_gateway"),
            }
        }
    }

    #[async_trait]
    impl CurrentUserGateway for StubGateway {
        async fn fetch_self(&self) -> RealtoResult<UserProfile> {
            if self.fail_fetch_self {
                return Err(Self::network_error("profile fetch refused"));
            }

            Ok(UserProfile {
                email: "a@b.com".to_string(),
                roles: self.roles.iter().map(|r| UserRole::from(*r)).collect(),
                ..Default::default()
            })
        }

        async fn login(&self, credentials: &Credentials) -> RealtoResult<LoginPayload> {
            Ok(LoginPayload {
                token: self.token.clone(),
                user: UserProfile {
                    email: credentials.email.clone(),
                    roles: self.roles.iter().map(|r| UserRole::from(*r)).collect(),
                    ..Default::default()
                },
            })
        }

        async fn logout(&self) -> RealtoResult<()> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);

            if self.fail_logout {
                return Err(Self::network_error("logout refused"));
            }
            Ok(())
        }
    }

    /// A store that refuses writes, for login-rollback tests.
    struct ReadOnlyStore;

    #[async_trait]
    impl TokenStore for ReadOnlyStore {
        async fn read(&self) -> RealtoResult<Option<String>> {
            Ok(None)
        }

        async fn write(&self, _token: &str) -> RealtoResult<()> {
            Err(realto_core::storage_error!("write refused", "read_only_store"))
        }

        async fn remove(&self) -> RealtoResult<()> {
            Ok(())
        }

        fn label(&self) -> &'static str {
            "read_only"
        }
    }

    struct Fixture {
        manager: Arc<SessionManager>,
        durable: Arc<MemoryTokenStore>,
        session_store: Arc<MemoryTokenStore>,
        gateway: Arc<StubGateway>,
    }

    fn fixture(gateway: StubGateway) -> Fixture {
        let durable = Arc::new(MemoryTokenStore::new());
        let session_store = Arc::new(MemoryTokenStore::new());
        let vault = TokenVault::new(durable.clone(), session_store.clone());
        let gateway = Arc::new(gateway);
        let manager = Arc::new(SessionManager::new(
            SessionState::new(),
            vault,
            gateway.clone(),
        ));

        Fixture {
            manager,
            durable,
            session_store,
            gateway,
        }
    }

    struct RecordingNavigator {
        calls: AtomicUsize,
    }

    impl Navigator for RecordingNavigator {
        fn to_login(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_login_with_remember_me_persists_to_durable_store() {
        let fx = fixture(StubGateway {
            token: "T1".to_string(),
            roles: vec!["admin"],
            ..Default::default()
        });

        let credentials = Credentials::new("a@b.com", "pw");
        let user = fx.manager.login(&credentials, true).await.unwrap();

        assert!(fx.manager.is_authenticated());
        assert_eq!(fx.manager.token(), "T1");
        assert_eq!(user.roles, vec![UserRole::from("admin")]);
        assert_eq!(fx.manager.roles(), vec![UserRole::from("admin")]);

        assert_eq!(fx.durable.read().await.unwrap(), Some("T1".to_string()));
        assert_eq!(fx.session_store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_without_remember_me_persists_to_session_store() {
        let fx = fixture(StubGateway {
            token: "T2".to_string(),
            ..Default::default()
        });

        fx.manager
            .login(&Credentials::new("a@b.com", "pw"), false)
            .await
            .unwrap();

        assert_eq!(fx.durable.read().await.unwrap(), None);
        assert_eq!(fx.session_store.read().await.unwrap(), Some("T2".to_string()));
    }

    #[tokio::test]
    async fn test_login_storage_failure_rolls_back_and_surfaces_error() {
        let gateway = Arc::new(StubGateway {
            token: "T1".to_string(),
            ..Default::default()
        });
        let vault = TokenVault::new(Arc::new(ReadOnlyStore), Arc::new(ReadOnlyStore));
        let manager = SessionManager::new(SessionState::new(), vault, gateway);

        let outcome = manager.login(&Credentials::new("a@b.com", "pw"), true).await;

        assert!(matches!(outcome, Err(RealtoError::Storage { .. })));
        assert!(!manager.is_authenticated());
        assert!(manager.token().is_empty());
    }

    #[tokio::test]
    async fn test_restore_without_stored_token_is_silent() {
        let fx = fixture(StubGateway::default());

        let session = fx.manager.restore().await.unwrap();

        assert!(!session.is_authenticated());
        assert!(!fx.manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_with_stored_token_fetches_profile() {
        let fx = fixture(StubGateway {
            roles: vec!["moderator"],
            ..Default::default()
        });
        fx.durable.write("T1").await.unwrap();

        let session = fx.manager.restore().await.unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.token, "T1");
        assert_eq!(fx.manager.roles(), vec![UserRole::from("moderator")]);
    }

    #[tokio::test]
    async fn test_restore_profile_failure_clears_token_silently() {
        let fx = fixture(StubGateway {
            fail_fetch_self: true,
            ..Default::default()
        });
        fx.durable.write("T1").await.unwrap();

        let session = fx.manager.restore().await.unwrap();

        assert!(!session.is_authenticated());
        assert!(!fx.manager.is_authenticated());
        assert_eq!(fx.durable.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_when_request_fails() {
        let fx = fixture(StubGateway {
            token: "T1".to_string(),
            fail_logout: true,
            ..Default::default()
        });

        fx.manager
            .login(&Credentials::new("a@b.com", "pw"), true)
            .await
            .unwrap();
        assert!(fx.manager.is_authenticated());

        fx.manager.logout().await.unwrap();

        assert!(!fx.manager.is_authenticated());
        assert_eq!(fx.gateway.logout_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.durable.read().await.unwrap(), None);
        assert_eq!(fx.session_store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_forced_logout_expires_session_and_navigates_once() {
        let fx = fixture(StubGateway {
            token: "T1".to_string(),
            ..Default::default()
        });
        fx.manager
            .login(&Credentials::new("a@b.com", "pw"), true)
            .await
            .unwrap();

        let navigator = Arc::new(RecordingNavigator {
            calls: AtomicUsize::new(0),
        });
        let handler = ForcedLogout::new(&fx.manager, navigator.clone());

        handler.on_unauthorized().await;

        assert!(!fx.manager.is_authenticated());
        assert_eq!(navigator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.durable.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_events_are_broadcast() {
        let fx = fixture(StubGateway {
            token: "T1".to_string(),
            ..Default::default()
        });
        let mut events = fx.manager.subscribe();

        fx.manager
            .login(&Credentials::new("a@b.com", "pw"), false)
            .await
            .unwrap();
        fx.manager.logout().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
