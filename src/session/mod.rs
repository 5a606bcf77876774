//! Session lifecycle: login, logout, restore, and token persistence.
//!
//! The manager owns the bearer token and the authenticated user's profile.
//! Both are either present together (validated by a successful profile
//! fetch) or absent together; a token without a profile exists only inside
//! a login/restore call, never across one.

pub mod store;

pub use store::{FileStore, MemoryStore, PersistedProfile, PersistedSession, SessionStore};

use chrono::{Duration, Utc};

use crate::api::{ApiError, UserApi};
use crate::models::UserRecord;

/// Owns the authentication token and current user profile.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    token: Option<String>,
    user: Option<UserRecord>,
    profile_ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Box<dyn SessionStore>, profile_ttl_hours: i64) -> Self {
        Self {
            store,
            token: None,
            user: None,
            profile_ttl: Duration::hours(profile_ttl_hours.max(0)),
        }
    }

    /// The held bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The authenticated user's profile, if loaded.
    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    /// True iff a non-empty token is held, independent of whether the
    /// profile has loaded yet.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Log in with credentials: token exchange, then profile fetch.
    ///
    /// Any failure at either step clears the session entirely; no partial
    /// state survives. Failures are never retried here.
    pub async fn login(
        &mut self,
        api: &dyn UserApi,
        email: &str,
        password: &str,
    ) -> Result<&UserRecord, ApiError> {
        let token = match api.authenticate(email, password).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Login failed");
                self.logout();
                return Err(e);
            }
        };

        self.token = Some(token);

        match api.fetch_profile(self.token.as_deref().unwrap_or_default()).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, email = %user.email, "Logged in");
                self.user = Some(user);
                self.persist();
                Ok(self.user.as_ref().expect("profile just stored"))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile fetch after login failed");
                self.logout();
                Err(e)
            }
        }
    }

    /// Clear token, user and persisted storage unconditionally. Idempotent.
    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
        if let Err(e) = self.store.clear() {
            // The in-memory session is gone either way.
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
    }

    /// Rehydrate the session from durable storage at startup.
    ///
    /// A persisted token with a fresh cached profile is adopted without a
    /// network round-trip. A stale or missing profile triggers a refresh;
    /// a failed refresh behaves exactly as a failed login (full clear) and
    /// the error is returned for the caller to surface.
    pub async fn restore(&mut self, api: &dyn UserApi) -> Result<(), ApiError> {
        let persisted = match self.store.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted session, starting logged out");
                self.logout();
                return Ok(());
            }
        };

        if let Some(profile) = &persisted.profile {
            if Utc::now() - profile.saved_at <= self.profile_ttl {
                tracing::debug!(user_id = profile.user.id, "Restored session from storage");
                self.token = Some(persisted.token);
                self.user = Some(profile.user.clone());
                return Ok(());
            }
        }

        self.token = Some(persisted.token.clone());
        match api.fetch_profile(&persisted.token).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Refreshed profile for restored session");
                self.user = Some(user);
                self.persist();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile refresh failed, clearing session");
                self.logout();
                Err(e)
            }
        }
    }

    /// Write the current session to durable storage. Persistence failures
    /// are logged; the in-memory session stays valid.
    fn persist(&self) {
        let Some(token) = &self.token else { return };

        let session = PersistedSession {
            token: token.clone(),
            profile: self.user.as_ref().map(|user| PersistedProfile {
                saved_at: Utc::now(),
                user: user.clone(),
            }),
        };

        if let Err(e) = self.store.save(&session) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use crate::models::{Role, UserPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile_record() -> UserRecord {
        UserRecord {
            id: 1,
            name: "John".to_string(),
            email: "john@mail.com".to_string(),
            role: Role::Admin,
            avatar_url: "https://example.com/john.png".to_string(),
        }
    }

    /// Scripted collaborator: fails the configured steps, counts calls.
    struct StubApi {
        fail_authenticate: bool,
        fail_profile: bool,
        profile_calls: AtomicUsize,
    }

    impl StubApi {
        fn ok() -> Self {
            Self {
                fail_authenticate: false,
                fail_profile: false,
                profile_calls: AtomicUsize::new(0),
            }
        }

        fn bad_credentials() -> Self {
            Self {
                fail_authenticate: true,
                ..Self::ok()
            }
        }

        fn bad_token() -> Self {
            Self {
                fail_profile: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl UserApi for StubApi {
        async fn authenticate(&self, _email: &str, _password: &str) -> Result<String, ApiError> {
            if self.fail_authenticate {
                Err(ApiError::auth("Invalid credentials"))
            } else {
                Ok("tok-123".to_string())
            }
        }

        async fn fetch_profile(&self, _token: &str) -> Result<UserRecord, ApiError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_profile {
                Err(ApiError::auth("Invalid token"))
            } else {
                Ok(profile_record())
            }
        }

        async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
            unimplemented!("not used by session tests")
        }

        async fn fetch_user(&self, _id: i64) -> Result<UserRecord, ApiError> {
            unimplemented!("not used by session tests")
        }

        async fn create_user(&self, _payload: &UserPayload) -> Result<UserRecord, ApiError> {
            unimplemented!("not used by session tests")
        }

        async fn update_user(
            &self,
            _id: i64,
            _payload: &UserPayload,
        ) -> Result<UserRecord, ApiError> {
            unimplemented!("not used by session tests")
        }

        async fn delete_user(&self, _id: i64) -> Result<(), ApiError> {
            unimplemented!("not used by session tests")
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Box::new(MemoryStore::new()), 24)
    }

    #[tokio::test]
    async fn test_login_success_holds_token_and_user() {
        let mut session = manager();
        let api = StubApi::ok();

        let user = session.login(&api, "john@mail.com", "changeme").await.unwrap();
        assert_eq!(user.id, 1);
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("tok-123"));
        assert!(session.user().is_some());
    }

    #[tokio::test]
    async fn test_login_bad_credentials_leaves_no_state() {
        let mut session = manager();
        let api = StubApi::bad_credentials();

        let err = session.login(&api, "john@mail.com", "wrong").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_login_profile_failure_clears_token_too() {
        // Token exchange succeeded but the profile fetch did not; no
        // half-authenticated state may survive.
        let mut session = manager();
        let api = StubApi::bad_token();

        assert!(session.login(&api, "john@mail.com", "changeme").await.is_err());
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let mut session = manager();
        session.logout();
        session.logout();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_with_fresh_profile_skips_network() {
        let store = MemoryStore::new();
        store
            .save(&PersistedSession {
                token: "tok-123".to_string(),
                profile: Some(PersistedProfile {
                    saved_at: Utc::now(),
                    user: profile_record(),
                }),
            })
            .unwrap();

        let mut session = SessionManager::new(Box::new(store), 24);
        let api = StubApi::ok();

        session.restore(&api).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(api.profile_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restore_with_missing_profile_refreshes() {
        let store = MemoryStore::new();
        store
            .save(&PersistedSession {
                token: "tok-123".to_string(),
                profile: None,
            })
            .unwrap();

        let mut session = SessionManager::new(Box::new(store), 24);
        let api = StubApi::ok();

        session.restore(&api).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().id, 1);
        assert_eq!(api.profile_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_with_stale_profile_refreshes() {
        let store = MemoryStore::new();
        store
            .save(&PersistedSession {
                token: "tok-123".to_string(),
                profile: Some(PersistedProfile {
                    saved_at: Utc::now() - Duration::hours(48),
                    user: profile_record(),
                }),
            })
            .unwrap();

        let mut session = SessionManager::new(Box::new(store), 24);
        let api = StubApi::ok();

        session.restore(&api).await.unwrap();
        assert_eq!(api.profile_calls.load(Ordering::SeqCst), 1);
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_refresh_failure_degrades_to_logged_out() {
        let store = MemoryStore::new();
        store
            .save(&PersistedSession {
                token: "expired".to_string(),
                profile: None,
            })
            .unwrap();

        let mut session = SessionManager::new(Box::new(store), 24);
        let api = StubApi::bad_token();

        assert!(session.restore(&api).await.is_err());
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        // Persisted storage is cleared as well.
        assert!(session.store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_persisted_session_is_noop() {
        let mut session = manager();
        let api = StubApi::ok();

        session.restore(&api).await.unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(api.profile_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_login_persists_both_entries() {
        // Synchronous harness over the async login, per tokio-test.
        let store = MemoryStore::new();
        let mut session = SessionManager::new(Box::new(store), 24);
        let api = StubApi::ok();

        tokio_test::block_on(session.login(&api, "john@mail.com", "changeme")).unwrap();

        let persisted = session.store.load().unwrap().unwrap();
        assert_eq!(persisted.token, "tok-123");
        assert_eq!(persisted.profile.unwrap().user.id, 1);
    }
}
