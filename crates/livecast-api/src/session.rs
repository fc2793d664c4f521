//! Process-wide sign-in session.
//!
//! A [`Session`] starts uninitialized. [`Session::initialize`] begins
//! observing auth state: the state is `loading` until the provider reports
//! any persisted sign-in, then settles. Observers receive every change through
//! a `watch` channel; [`Session::teardown`] drops the user and closes them.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::identity::{IdentityError, IdentityProvider, SessionUser, SignedIn};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Firebase not initialized")]
    NotInitialized,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least 6 characters")]
    WeakPassword,

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Observable auth state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub loading: bool,
}

/// Check a new password and its confirmation, in that order.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), SessionError> {
    if password != confirm {
        return Err(SessionError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SessionError::WeakPassword);
    }
    Ok(())
}

pub struct Session<P> {
    provider: P,
    state: Option<watch::Sender<SessionState>>,
}

impl<P: IdentityProvider> Session<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, state: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Start observing auth state. Calling it again returns a new observer of
    /// the existing state.
    pub async fn initialize(&mut self) -> watch::Receiver<SessionState> {
        if let Some(tx) = &self.state {
            return tx.subscribe();
        }

        let (tx, rx) = watch::channel(SessionState {
            user: None,
            loading: true,
        });

        let restored = match self.provider.restore().await {
            Ok(signed_in) => signed_in.map(|s| s.user),
            Err(e) => {
                warn!(error = %e, "Could not restore previous sign-in");
                None
            }
        };

        tx.send_modify(|state| {
            state.user = restored;
            state.loading = false;
        });
        info!(signed_in = tx.borrow().user.is_some(), "Session initialized");

        self.state = Some(tx);
        rx
    }

    fn sender(&self) -> Result<&watch::Sender<SessionState>, SessionError> {
        self.state.as_ref().ok_or(SessionError::NotInitialized)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, SessionError> {
        let tx = self.sender()?;
        let signed_in = self.provider.sign_in(email, password).await?;
        let user = signed_in.user.clone();
        tx.send_modify(|state| state.user = Some(user));
        Ok(signed_in)
    }

    /// Create an account and sign into it.
    pub async fn sign_up(&self, email: &str, password: &str, confirm: &str) -> Result<SignedIn, SessionError> {
        let tx = self.sender()?;
        validate_new_password(password, confirm)?;
        let signed_in = self.provider.sign_up(email, password).await?;
        let user = signed_in.user.clone();
        tx.send_modify(|state| state.user = Some(user));
        Ok(signed_in)
    }

    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let tx = self.sender()?;
        let current = tx.borrow().user.clone();
        if let Some(user) = current {
            self.provider.sign_out(&user).await?;
            info!(uid = %user.uid, "Signed out");
        }
        tx.send_modify(|state| state.user = None);
        Ok(())
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.state.as_ref().and_then(|tx| tx.borrow().user.clone())
    }

    /// New observer of auth state changes.
    pub fn observe(&self) -> Result<watch::Receiver<SessionState>, SessionError> {
        Ok(self.sender()?.subscribe())
    }

    /// Stop observing. Existing observers see the channel close.
    pub fn teardown(&mut self) {
        if self.state.take().is_some() {
            info!("Session torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MockIdentityProvider;

    fn signed_in(uid: &str) -> SignedIn {
        SignedIn {
            user: SessionUser {
                uid: uid.into(),
                email: Some(format!("{uid}@example.com")),
            },
            id_token: "token".into(),
            refresh_token: "refresh".into(),
            expires_in: 3600,
        }
    }

    fn provider_without_persisted_user() -> MockIdentityProvider {
        let mut provider = MockIdentityProvider::new();
        provider.expect_restore().returning(|| Ok(None));
        provider
    }

    #[test]
    fn test_validate_new_password() {
        assert!(matches!(
            validate_new_password("secret1", "secret2"),
            Err(SessionError::PasswordMismatch)
        ));
        assert!(matches!(
            validate_new_password("abc", "abc"),
            Err(SessionError::WeakPassword)
        ));
        tokio_test::assert_ok!(validate_new_password("secret", "secret"));
    }

    #[tokio::test]
    async fn test_calls_before_initialize_fail() {
        let provider = MockIdentityProvider::new();
        let session = Session::new(provider);

        let err = session.sign_in("a@example.com", "secret1").await.unwrap_err();
        assert_eq!(err.to_string(), "Firebase not initialized");
        assert!(matches!(
            session.sign_up("a@example.com", "x", "y").await,
            Err(SessionError::NotInitialized)
        ));
        assert!(matches!(session.sign_out().await, Err(SessionError::NotInitialized)));
        assert!(session.observe().is_err());
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_initialize_settles_signed_out() {
        let mut session = Session::new(provider_without_persisted_user());
        let rx = session.initialize().await;
        assert_eq!(*rx.borrow(), SessionState { user: None, loading: false });
        assert!(session.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_restores_persisted_user() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_restore().returning(|| Ok(Some(signed_in("u1"))));
        let mut session = Session::new(provider);
        session.initialize().await;
        assert_eq!(session.current_user().unwrap().uid, "u1");
    }

    #[tokio::test]
    async fn test_sign_in_notifies_observers() {
        let mut provider = provider_without_persisted_user();
        provider
            .expect_sign_in()
            .withf(|email, password| email == "admin@example.com" && password == "secret1")
            .times(1)
            .returning(|_, _| Ok(signed_in("admin")));

        let mut session = Session::new(provider);
        let mut rx = session.initialize().await;

        session.sign_in("admin@example.com", "secret1").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().user.as_ref().unwrap().uid, "admin");
        assert_eq!(session.current_user().unwrap().uid, "admin");
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_state() {
        let mut provider = provider_without_persisted_user();
        provider
            .expect_sign_in()
            .returning(|_, _| Err(IdentityError::InvalidCredentials));

        let mut session = Session::new(provider);
        session.initialize().await;
        let err = session.sign_in("admin@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_validates_before_calling_provider() {
        let mut provider = provider_without_persisted_user();
        provider.expect_sign_up().never();

        let mut session = Session::new(provider);
        session.initialize().await;

        let err = session.sign_up("a@example.com", "secret1", "secret2").await.unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
        let err = session.sign_up("a@example.com", "abc", "abc").await.unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_out() {
        let mut provider = provider_without_persisted_user();
        provider.expect_sign_up().returning(|_, _| Ok(signed_in("new")));
        provider.expect_sign_out().times(1).returning(|_| Ok(()));

        let mut session = Session::new(provider);
        session.initialize().await;
        session.sign_up("new@example.com", "secret1", "secret1").await.unwrap();
        assert_eq!(session.current_user().unwrap().uid, "new");

        session.sign_out().await.unwrap();
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_teardown_closes_observers() {
        let mut session = Session::new(provider_without_persisted_user());
        session.initialize().await;
        let mut rx = session.observe().unwrap();

        session.teardown();
        assert!(rx.changed().await.is_err());
        assert!(!session.is_initialized());
        assert!(matches!(session.sign_out().await, Err(SessionError::NotInitialized)));
    }
}
