use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quiz_core::model::Identity;
use storage::repository::{CredentialRepository, IdentityRepository, Storage, TokenStore};

use super::token::{Base64JsonCodec, TokenCodec};
use crate::error::AuthError;
use crate::in_flight::InFlightGuard;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
        }
    }
}

/// Owns "who is the current user" for one browsing session.
///
/// Clones share the same state, so every consumer sees a transition as soon as
/// the call that made it resolves. Lifecycle: [`SessionStore::new`] →
/// [`SessionStore::initialize`] → login/logout → [`SessionStore::teardown`].
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<SessionSnapshot>>,
    login_in_flight: Arc<AtomicBool>,
    identities: Arc<dyn IdentityRepository>,
    credentials: Arc<dyn CredentialRepository>,
    tokens: Arc<dyn TokenStore>,
    codec: Arc<dyn TokenCodec>,
}

impl SessionStore {
    /// Create a store in the loading state.
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        credentials: Arc<dyn CredentialRepository>,
        tokens: Arc<dyn TokenStore>,
        codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionSnapshot::initial())),
            login_in_flight: Arc::new(AtomicBool::new(false)),
            identities,
            credentials,
            tokens,
            codec,
        }
    }

    /// Store over `storage` using [`Base64JsonCodec`].
    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.identities),
            Arc::clone(&storage.credentials),
            Arc::clone(&storage.tokens),
            Arc::new(Base64JsonCodec),
        )
    }

    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, next: SessionSnapshot) {
        *self.lock() = next;
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Restore the session from the persisted token, if any.
    ///
    /// A token that fails to decode is discarded and the session ends up
    /// signed out; that case is not reported as an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the token slot cannot be read. The
    /// session is left signed out and no longer loading.
    pub async fn initialize(&self) -> Result<Option<Identity>, AuthError> {
        let token = match self.tokens.load_token().await {
            Ok(token) => token,
            Err(err) => {
                self.set(SessionSnapshot::signed_out());
                return Err(err.into());
            }
        };

        let Some(token) = token else {
            self.set(SessionSnapshot::signed_out());
            return Ok(None);
        };

        match self.codec.decode(&token) {
            Ok(identity) => {
                tracing::info!(user = %identity.id(), role = %identity.role(), "session restored");
                self.set(SessionSnapshot::signed_in(identity.clone()));
                Ok(Some(identity))
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session token");
                if let Err(clear_err) = self.tokens.clear_token().await {
                    tracing::warn!(error = %clear_err, "failed to clear session token");
                }
                self.set(SessionSnapshot::signed_out());
                Ok(None)
            }
        }
    }

    /// Sign in with an email and secret.
    ///
    /// On failure the existing session, if any, is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginInFlight` while another login is outstanding,
    /// `AuthError::InvalidCredentials` when the pair does not match a user,
    /// and `AuthError::Storage` on persistence failures.
    pub async fn login(&self, email: &str, secret: &str) -> Result<Identity, AuthError> {
        let _guard =
            InFlightGuard::try_acquire(&self.login_in_flight).ok_or(AuthError::LoginInFlight)?;

        let email = email.trim();
        if !self.credentials.verify_credential(email, secret).await? {
            tracing::info!(email, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        let Some(identity) = self.identities.find_identity_by_email(email).await? else {
            tracing::warn!(email, "credential matched but no user record exists");
            return Err(AuthError::InvalidCredentials);
        };

        let token = self.codec.encode(&identity)?;
        self.tokens.save_token(&token).await?;
        tracing::info!(user = %identity.id(), role = %identity.role(), "signed in");
        self.set(SessionSnapshot::signed_in(identity.clone()));
        Ok(identity)
    }

    /// Sign out and forget the persisted token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the token cannot be cleared. The
    /// in-memory session is signed out either way.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let previous = self.lock().identity.take();
        self.set(SessionSnapshot::signed_out());
        if let Some(identity) = previous {
            tracing::info!(user = %identity.id(), "signed out");
        }
        self.tokens.clear_token().await?;
        Ok(())
    }

    /// Reset in-memory state to the freshly created state.
    ///
    /// The persisted token is kept, so a later [`SessionStore::initialize`]
    /// restores the same user.
    pub fn teardown(&self) {
        self.set(SessionSnapshot::initial());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Role, UserId};
    use quiz_core::time::fixed_now;

    async fn store_with_student() -> (Storage, SessionStore) {
        let storage = Storage::in_memory();
        let student = Identity::new(
            UserId::new("user-student-01"),
            "student@skillforge.com",
            "Student User",
            Role::Student,
            fixed_now(),
        )
        .unwrap();
        storage.identities.insert_identity(&student).await.unwrap();
        storage
            .credentials
            .set_credential("student@skillforge.com", "student123")
            .await
            .unwrap();
        let store = SessionStore::from_storage(&storage);
        (storage, store)
    }

    #[tokio::test]
    async fn starts_loading_and_settles_without_token() {
        let (_storage, store) = store_with_student().await;
        assert_eq!(store.snapshot(), SessionSnapshot::initial());

        assert_eq!(store.initialize().await.unwrap(), None);
        assert_eq!(store.snapshot(), SessionSnapshot::signed_out());
    }

    #[tokio::test]
    async fn login_persists_token_and_restore_reads_it() {
        let (storage, store) = store_with_student().await;
        store.initialize().await.unwrap();

        let identity = store
            .login("  student@skillforge.com ", "student123")
            .await
            .unwrap();
        assert_eq!(identity.role(), Role::Student);
        assert!(storage.tokens.load_token().await.unwrap().is_some());

        let restored = SessionStore::from_storage(&storage);
        assert_eq!(restored.initialize().await.unwrap(), Some(identity));
        assert!(!restored.is_loading());
    }

    #[tokio::test]
    async fn corrupt_token_is_cleared_on_initialize() {
        let (storage, store) = store_with_student().await;
        storage.tokens.save_token("not-a-token").await.unwrap();

        assert_eq!(store.initialize().await.unwrap(), None);
        assert_eq!(store.snapshot(), SessionSnapshot::signed_out());
        assert_eq!(storage.tokens.load_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_login_keeps_existing_session() {
        let (_storage, store) = store_with_student().await;
        store.initialize().await.unwrap();
        store
            .login("student@skillforge.com", "student123")
            .await
            .unwrap();
        let before = store.snapshot();

        let err = store
            .login("nobody@skillforge.com", "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn credential_without_user_record_is_invalid() {
        let (storage, store) = store_with_student().await;
        storage
            .credentials
            .set_credential("ghost@skillforge.com", "ghost123")
            .await
            .unwrap();
        let err = store
            .login("ghost@skillforge.com", "ghost123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn concurrent_login_is_rejected_while_one_is_outstanding() {
        let (_storage, store) = store_with_student().await;
        let held = InFlightGuard::try_acquire(&store.login_in_flight).unwrap();
        let err = store
            .login("student@skillforge.com", "student123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginInFlight));

        drop(held);
        assert!(
            store
                .login("student@skillforge.com", "student123")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn logout_clears_token_and_teardown_keeps_it() {
        let (storage, store) = store_with_student().await;
        store
            .login("student@skillforge.com", "student123")
            .await
            .unwrap();

        store.teardown();
        assert_eq!(store.snapshot(), SessionSnapshot::initial());
        assert!(storage.tokens.load_token().await.unwrap().is_some());

        store.initialize().await.unwrap();
        assert!(store.current_identity().is_some());
        store.logout().await.unwrap();
        assert_eq!(store.snapshot(), SessionSnapshot::signed_out());
        assert_eq!(storage.tokens.load_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let (_storage, store) = store_with_student().await;
        let observer = store.clone();
        store
            .login("student@skillforge.com", "student123")
            .await
            .unwrap();
        assert!(observer.current_identity().is_some());
    }
}
