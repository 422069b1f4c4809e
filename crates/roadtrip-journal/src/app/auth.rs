//! Authentication session service
//!
//! Authenticates against the mock user repository, persists the session
//! identity in the secure store, and attaches freshly computed statistics to
//! every user it returns. Stats are never stored, so adding or removing a trip
//! is reflected on the next login or restore.

use crate::app::storage::SecureStore;
use crate::{JournalError, JournalResult};
use roadtrip_lib::{MockBackend, Operation, User};
use std::sync::Arc;

/// Secure-store key holding the session token
pub const TOKEN_KEY: &str = "auth_token";

/// Secure-store key holding the authenticated user's id
pub const USER_ID_KEY: &str = "user_id";

/// Result of a successful login
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    backend: Arc<MockBackend>,
    storage: Arc<dyn SecureStore>,
}

impl AuthService {
    pub fn new(backend: Arc<MockBackend>, storage: Arc<dyn SecureStore>) -> Self {
        Self { backend, storage }
    }

    /// Log in with an email address.
    ///
    /// The mock does not check passwords: any known email is accepted. Unknown
    /// emails fail with `InvalidCredentials`.
    pub async fn login(&self, email: &str) -> JournalResult<AuthSession> {
        self.backend.latency().sleep(Operation::Authenticate).await;

        let user = self.backend.user_by_email(email).await?;
        let token = format!("mock-jwt-token-{}", user.id);

        self.storage.set(TOKEN_KEY, &token).await?;
        self.storage.set(USER_ID_KEY, &user.id).await?;

        let user = self.backend.user_with_stats(user).await?;
        tracing::info!("Logged in as {} ({})", user.id, user.email);
        Ok(AuthSession { user, token })
    }

    /// Forget the persisted session. Storage errors are logged, never returned.
    pub async fn logout(&self) {
        for key in [TOKEN_KEY, USER_ID_KEY] {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!("Failed to clear {} during logout: {}", key, e);
            }
        }
        tracing::info!("Logged out");
    }

    /// Restore the user of a persisted session, if any.
    ///
    /// Missing ids, ids that no longer resolve, and lookup failures all yield
    /// `None`: a broken session is treated as no session.
    pub async fn restore_session(&self) -> Option<User> {
        match self.try_restore_session().await {
            Ok(Some(user)) => {
                tracing::info!("Restored session for {}", user.id);
                Some(user)
            }
            Ok(None) => {
                tracing::debug!("No session to restore");
                None
            }
            Err(e) => {
                tracing::warn!("Session restore failed, continuing logged out: {}", e);
                None
            }
        }
    }

    async fn try_restore_session(&self) -> JournalResult<Option<User>> {
        let Some(user_id) = self.storage.get(USER_ID_KEY).await? else {
            return Ok(None);
        };

        let user = match self.backend.users.get_by_id(&user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(JournalError::from(e)),
        };

        Ok(Some(self.backend.user_with_stats(user).await?))
    }

    /// Simulate a remote profile update by echoing the input after a delay.
    pub async fn update_profile(&self, user: User) -> JournalResult<User> {
        self.backend.latency().sleep(Operation::UpdateProfile).await;
        tracing::debug!("Profile updated for {}", user.id);
        Ok(user)
    }

    /// The persisted session token, if any
    pub async fn token(&self) -> JournalResult<Option<String>> {
        Ok(self.storage.get(TOKEN_KEY).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::storage::{MemorySecureStore, StorageError, StorageResult};
    use async_trait::async_trait;
    use roadtrip_lib::{DataError, MockLatency};

    fn service() -> (AuthService, Arc<MockBackend>, Arc<MemorySecureStore>) {
        let backend = Arc::new(MockBackend::from_fixtures(MockLatency::default()).unwrap());
        let storage = Arc::new(MemorySecureStore::new());
        let auth = AuthService::new(backend.clone(), storage.clone());
        (auth, backend, storage)
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_persists_session_and_computes_stats() {
        let (auth, _, storage) = service();
        let session = auth.login("alice@example.com").await.unwrap();

        assert_eq!(session.user.id, "user1");
        assert_eq!(session.token, "mock-jwt-token-user1");
        let stats = session.user.stats.unwrap();
        assert_eq!(stats.roadtrips_count, 2);
        assert_eq!(stats.countries_visited, 2);

        assert_eq!(storage.get(USER_ID_KEY).await.unwrap().as_deref(), Some("user1"));
        assert_eq!(auth.token().await.unwrap().as_deref(), Some("mock-jwt-token-user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_unknown_email() {
        let (auth, _, storage) = service();
        let err = auth.login("mallory@example.com").await.unwrap_err();
        assert_eq!(err, JournalError::Data(DataError::InvalidCredentials));
        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_clears_storage() {
        let (auth, _, storage) = service();
        auth.login("alice@example.com").await.unwrap();
        auth.logout().await;
        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(storage.get(USER_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_session() {
        let (auth, _, _) = service();
        assert_eq!(auth.restore_session().await, None);

        auth.login("bruno@example.com").await.unwrap();
        let user = auth.restore_session().await.unwrap();
        assert_eq!(user.id, "user2");
        assert_eq!(user.stats.unwrap().roadtrips_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_session_with_unknown_user_is_absent() {
        let (auth, _, storage) = service();
        storage.set(USER_ID_KEY, "ghost").await.unwrap();
        assert_eq!(auth.restore_session().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_follow_trip_changes() {
        let (auth, backend, _) = service();
        auth.login("alice@example.com").await.unwrap();
        backend.delete_roadtrip("rt2").await.unwrap();

        let user = auth.restore_session().await.unwrap();
        let stats = user.stats.unwrap();
        assert_eq!(stats.roadtrips_count, 1);
        assert_eq!(stats.distance_traveled, 583);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_profile_echoes_input() {
        let (auth, _, _) = service();
        let mut user = auth.login("alice@example.com").await.unwrap().user;
        user.bio = Some("Now with more mountains".to_string());
        assert_eq!(auth.update_profile(user.clone()).await.unwrap(), user);
    }

    struct BrokenStore;

    #[async_trait]
    impl SecureStore for BrokenStore {
        async fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Platform("keychain locked".to_string()))
        }

        async fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Platform("keychain locked".to_string()))
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Platform("keychain locked".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failures() {
        let backend = Arc::new(MockBackend::from_fixtures(MockLatency::default()).unwrap());
        let auth = AuthService::new(backend, Arc::new(BrokenStore));

        let err = auth.login("alice@example.com").await.unwrap_err();
        assert!(matches!(err, JournalError::Storage(_)));
        // Neither logout nor restore propagate storage failures
        auth.logout().await;
        assert_eq!(auth.restore_session().await, None);
    }
}
