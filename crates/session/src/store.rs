//! Session store: the single owner of the client-side session
//!
//! A [`SessionStore`] is a cheap handle over shared state. Every mutation goes
//! through one write lock that is never held across an await; token changes
//! are published on a watch channel for the refresh scheduler, and the
//! persisted subset is written to [`SessionStorage`] whenever it changes.

use crate::{
    error::{SessionError, SessionResult},
    storage::SessionStorage,
};
use portal_core::{
    PortalConfig, SessionSnapshot, TokenPair, User,
    snapshot::{self, Rehydrated},
};
use portal_http::{client::PublicApiClient, types::RegisterData};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, watch};

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const FORGOT_PASSWORD_FAILED: &str = "Failed to send reset email";
pub const RESET_PASSWORD_FAILED: &str = "Password reset failed";
pub const REFRESH_FAILED: &str = "Token refresh failed";

/// Observable session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub tokens: Option<TokenPair>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            user: snapshot.user,
            tokens: snapshot.tokens,
            is_authenticated: snapshot.is_authenticated,
            ..Self::default()
        }
    }

    /// The persisted subset
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            tokens: self.tokens.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn clear_session(&mut self) {
        self.user = None;
        self.tokens = None;
        self.is_authenticated = false;
        self.error = None;
    }
}

struct Inner {
    api: PublicApiClient,
    state: RwLock<SessionState>,
    tokens: watch::Sender<Option<TokenPair>>,
    storage: Arc<dyn SessionStorage>,
    refresh_gate: Mutex<()>,
}

/// Handle to the session; clones share state
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionStore")
            .field("base_url", &self.inner.api.base_url())
            .field("is_authenticated", &state.is_authenticated)
            .field("has_user", &state.user.is_some())
            .field("storage", &self.inner.storage)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Open a store, rehydrating whatever `storage` holds
    ///
    /// An unreadable or malformed blob starts an anonymous session.
    pub fn open(api: PublicApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        let persisted = match storage.load() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, starting anonymous");
                None
            }
        };

        let state = match snapshot::rehydrate(persisted.as_deref()) {
            Rehydrated::Session(snapshot) if snapshot.is_consistent() => {
                debug!(
                    authenticated = snapshot.is_authenticated,
                    has_user = snapshot.user.is_some(),
                    "Rehydrated persisted session"
                );
                SessionState::from_snapshot(snapshot)
            }
            Rehydrated::Session(_) => {
                warn!("Persisted session claims authentication without tokens, ignoring");
                SessionState::default()
            }
            Rehydrated::Anonymous => SessionState::default(),
        };

        let (tokens, _) = watch::channel(state.tokens.clone());

        Self {
            inner: Arc::new(Inner {
                api,
                state: RwLock::new(state),
                tokens,
                storage,
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    /// Open a store against the configured API
    pub fn from_config(
        config: &PortalConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> SessionResult<Self> {
        let api = PublicApiClient::from_config(&config.api)?;
        Ok(Self::open(api, storage))
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation, then persist and publish whatever it changed
    fn update<R>(&self, mutate: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, before, after) = {
            let mut state = self.write();
            let before = state.snapshot();
            let result = mutate(&mut state);
            (result, before, state.snapshot())
        };

        if before != after {
            self.persist(&after);
        }

        if before.tokens != after.tokens {
            self.inner.tokens.send_replace(after.tokens);
        }

        result
    }

    fn persist(&self, snapshot: &SessionSnapshot) {
        let result = snapshot::encode(snapshot).and_then(|blob| self.inner.storage.save(&blob));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn begin(&self) {
        self.update(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn finish(&self) {
        self.update(|state| state.is_loading = false);
    }

    fn fail(&self, error: SessionError) -> SessionError {
        let message = error.to_string();
        self.update(|state| {
            state.is_loading = false;
            state.error = Some(message);
        });
        error
    }

    /// Copy of the current state
    pub fn state(&self) -> SessionState {
        self.read().clone()
    }

    /// The persisted subset of the current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read().snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.read().tokens.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().tokens.as_ref().map(|t| t.access_token.clone())
    }

    fn refresh_token_value(&self) -> Option<String> {
        self.read()
            .tokens
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token_value().is_some()
    }

    /// Receiver that sees every token change
    pub fn subscribe_tokens(&self) -> watch::Receiver<Option<TokenPair>> {
        self.inner.tokens.subscribe()
    }

    /// The public API client this store talks through
    pub fn api(&self) -> &PublicApiClient {
        &self.inner.api
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| state.error = error);
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    /// Sign in and fetch the profile
    ///
    /// The profile fetch is best effort: if it fails the session is still
    /// authenticated, without a user.
    #[tracing::instrument(name = "session.login", skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<()> {
        self.begin();

        let tokens = match self.inner.api.login(email, password).await {
            Ok(tokens) => tokens,
            Err(e) => return Err(self.fail(SessionError::from_client(e, LOGIN_FAILED))),
        };

        let user = match self
            .inner
            .api
            .authenticate(tokens.access_token.as_str())
            .get_me()
            .await
        {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Signed in but failed to fetch profile");
                None
            }
        };

        self.update(|state| {
            state.user = user;
            state.tokens = Some(tokens);
            state.is_authenticated = true;
            state.is_loading = false;
        });

        info!("Signed in");
        Ok(())
    }

    /// Create an account; the session stays unauthenticated
    #[tracing::instrument(name = "session.register", skip_all)]
    pub async fn register(&self, data: &RegisterData) -> SessionResult<User> {
        self.begin();

        match self.inner.api.register(data).await {
            Ok(user) => {
                self.update(|state| {
                    state.user = Some(user.clone());
                    state.is_loading = false;
                });
                info!(user_id = user.id, "Registered account");
                Ok(user)
            }
            Err(e) => Err(self.fail(SessionError::from_client(e, REGISTRATION_FAILED))),
        }
    }

    /// Sign out; local state is always cleared
    #[tracing::instrument(name = "session.logout", skip_all)]
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.refresh_token_value() {
            if let Err(e) = self.inner.api.logout(&refresh_token).await {
                warn!(error = %e, "Remote logout failed");
            }
        }

        self.update(SessionState::clear_session);
        info!("Signed out");
    }

    /// Exchange the refresh token for a new pair
    ///
    /// Does nothing without a refresh token. On failure the session is logged
    /// out before the error is returned. Concurrent callers share one refresh:
    /// whoever waits behind an in-flight refresh adopts its outcome.
    #[tracing::instrument(name = "session.refresh", skip_all)]
    pub async fn refresh_token(&self) -> SessionResult<()> {
        let Some(seen) = self.refresh_token_value() else {
            return Ok(());
        };

        let _gate = self.inner.refresh_gate.lock().await;

        match self.refresh_token_value() {
            Some(current) if current == seen => {}
            Some(_) => {
                debug!("Tokens already refreshed by a concurrent caller");
                return Ok(());
            }
            None => return Err(SessionError::Auth(REFRESH_FAILED.to_string())),
        }

        match self.inner.api.refresh(&seen).await {
            Ok(tokens) => {
                debug!(expires_in = tokens.expires_in, "Refreshed tokens");
                self.update(|state| state.tokens = Some(tokens));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                self.logout().await;
                Err(SessionError::Auth(REFRESH_FAILED.to_string()))
            }
        }
    }

    #[tracing::instrument(name = "session.forgot_password", skip_all)]
    pub async fn forgot_password(&self, email: &str) -> SessionResult<()> {
        self.begin();
        match self.inner.api.forgot_password(email).await {
            Ok(()) => {
                self.finish();
                Ok(())
            }
            Err(e) => Err(self.fail(SessionError::from_client(e, FORGOT_PASSWORD_FAILED))),
        }
    }

    #[tracing::instrument(name = "session.reset_password", skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> SessionResult<()> {
        self.begin();
        match self.inner.api.reset_password(token, new_password).await {
            Ok(()) => {
                self.finish();
                Ok(())
            }
            Err(e) => Err(self.fail(SessionError::from_client(e, RESET_PASSWORD_FAILED))),
        }
    }

    /// Revoke every token server-side; local state is cleared either way
    #[tracing::instrument(name = "session.revoke_all_tokens", skip_all)]
    pub async fn revoke_all_tokens(&self) {
        let Some(access_token) = self.access_token() else {
            return;
        };

        if let Err(e) = self
            .inner
            .api
            .authenticate(access_token)
            .revoke_all_tokens()
            .await
        {
            warn!(error = %e, "Remote token revocation failed");
        }

        self.update(SessionState::clear_session);
        info!("Revoked all tokens");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn tokens(access: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: format!("{access}-refresh"),
            expires_in: 600,
            token_type: "bearer".to_string(),
        }
    }

    fn store_with(blob: Option<String>) -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(blob.map_or_else(MemoryStorage::new, MemoryStorage::with_blob));
        let api = PublicApiClient::new("http://127.0.0.1:9").unwrap();
        (SessionStore::open(api, storage.clone()), storage)
    }

    #[test]
    fn test_open_rehydrates_snapshot() {
        let snapshot = SessionSnapshot {
            user: None,
            tokens: Some(tokens("a")),
            is_authenticated: true,
        };
        let (store, _) = store_with(Some(snapshot::encode(&snapshot).unwrap()));

        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("a"));
        assert_eq!(store.snapshot(), snapshot);
        assert!(!store.state().is_loading);
    }

    #[test]
    fn test_open_rejects_inconsistent_snapshot() {
        let snapshot = SessionSnapshot {
            user: None,
            tokens: None,
            is_authenticated: true,
        };
        let (store, _) = store_with(Some(snapshot::encode(&snapshot).unwrap()));
        assert_eq!(store.state(), SessionState::default());
    }

    #[test]
    fn test_open_with_garbage_is_anonymous() {
        let (store, _) = store_with(Some("{ not json".to_string()));
        assert!(!store.is_authenticated());
        assert!(store.tokens().is_none());
    }

    #[test]
    fn test_transient_fields_do_not_persist() {
        let (store, storage) = store_with(None);
        store.set_error(Some("boom".into()));
        assert_eq!(store.state().error.as_deref(), Some("boom"));
        assert!(storage.contents().is_none());

        store.clear_error();
        assert!(store.state().error.is_none());
    }

    #[test]
    fn test_token_change_is_published_and_persisted() {
        let (store, storage) = store_with(None);
        let mut rx = store.subscribe_tokens();
        assert!(!rx.has_changed().unwrap());

        store.update(|state| {
            state.tokens = Some(tokens("b"));
            state.is_authenticated = true;
        });

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().access_token, "b");

        let persisted = snapshot::rehydrate(storage.contents().as_deref());
        assert!(persisted.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_api_unreachable() {
        let snapshot = SessionSnapshot {
            user: None,
            tokens: Some(tokens("c")),
            is_authenticated: true,
        };
        let (store, storage) = store_with(Some(snapshot::encode(&snapshot).unwrap()));
        store.set_error(Some("stale".into()));

        store.logout().await;

        assert_eq!(store.state(), SessionState::default());
        assert!(!snapshot::rehydrate(storage.contents().as_deref()).is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_is_noop() {
        let (store, _) = store_with(None);
        store.refresh_token().await.unwrap();
        assert_eq!(store.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_revoke_without_access_token_is_noop() {
        let (store, storage) = store_with(None);
        store.set_error(Some("kept".into()));
        store.revoke_all_tokens().await;
        assert_eq!(store.state().error.as_deref(), Some("kept"));
        assert!(storage.contents().is_none());
    }
}
