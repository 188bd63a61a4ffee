//! Credential session lifecycle and refresh coordination.
//!
//! Owns the injected credential store and navigation collaborator, plus the
//! refresh-in-progress flag and the queue of requests waiting for a refresh
//! to settle. At most one token refresh exchange is in flight at a time.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{AuthError, StoreError};
use crate::store::{
    self, CredentialStore, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_TOKEN_EXPIRATION, KEY_USER_ID,
    KEY_USER_INFO,
};

/// Fallback access-token lifetime when the server does not report one.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Token pair as issued by the login and refresh endpoints.
///
/// Zeroed on drop; Debug output never contains the token material.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds. Refresh responses may omit it.
    #[serde(default)]
    #[zeroize(skip)]
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Side-effect hook invoked when the session becomes unrecoverable and the
/// user must sign in again.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

/// Navigator that only logs. Suitable for headless use and tests.
#[derive(Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn to_login(&self) {
        warn!("Session expired, sign-in required");
    }
}

/// Navigator that opens the login page in the system browser.
pub struct BrowserNavigator {
    login_url: String,
}

impl BrowserNavigator {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }
}

impl Navigator for BrowserNavigator {
    fn to_login(&self) {
        info!("Opening login page: {}", self.login_url);
        if let Err(e) = open::that(&self.login_url) {
            warn!("Failed to open browser: {}", e);
        }
    }
}

/// A request parked while a refresh is in flight. Receives the new access
/// token, or the refresh error if the exchange failed.
type Waiter = oneshot::Sender<Result<String, AuthError>>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: Vec<Waiter>,
}

/// What an unauthorized request should do next.
pub(crate) enum UnauthorizedAction {
    /// The stored token already changed since this request was sent. Retry
    /// with it, no refresh needed.
    Retry(String),
    /// This request owns the refresh: perform the exchange and then settle
    /// the queue via [`Session::finish_refresh`].
    Lead,
    /// A refresh is already in flight. Await the outcome.
    Wait(oneshot::Receiver<Result<String, AuthError>>),
}

/// Credential session over an injected store and navigator.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    refresh: Mutex<RefreshState>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            navigator,
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    /// Current access token, if one is stored.
    pub fn access_token(&self) -> Option<Zeroizing<String>> {
        store::get_access_token(self.store.as_ref()).ok()
    }

    /// Current refresh token, if one is stored.
    pub fn refresh_token(&self) -> Option<Zeroizing<String>> {
        store::get_refresh_token(self.store.as_ref()).ok()
    }

    /// Stored user id, if signed in.
    pub fn user_id(&self) -> Option<String> {
        self.store.get(KEY_USER_ID).ok().flatten()
    }

    /// Stored user info JSON, if signed in.
    pub fn user_info(&self) -> Option<String> {
        self.store.get(KEY_USER_INFO).ok().flatten()
    }

    /// Whether any token material is present.
    pub fn has_credentials(&self) -> bool {
        store::has_tokens(self.store.as_ref())
    }

    /// Stored expiry as epoch milliseconds.
    pub fn token_expires_at(&self) -> Option<i64> {
        self.store
            .get(KEY_TOKEN_EXPIRATION)
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
    }

    /// Whether the stored access token has passed its expiry timestamp.
    /// Absent expiry counts as expired.
    pub fn is_token_expired(&self) -> bool {
        match self.token_expires_at() {
            Some(expires_at) => Utc::now().timestamp_millis() >= expires_at,
            None => true,
        }
    }

    /// Persist a token pair and its expiry timestamp.
    pub fn store_tokens(&self, tokens: &Tokens) -> Result<(), StoreError> {
        self.store.put(KEY_ACCESS_TOKEN, &tokens.access_token)?;
        self.store.put(KEY_REFRESH_TOKEN, &tokens.refresh_token)?;

        let ttl_secs = tokens.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let expires_at = Utc::now().timestamp_millis() + ttl_secs * 1000;
        self.store
            .put(KEY_TOKEN_EXPIRATION, &expires_at.to_string())?;

        Ok(())
    }

    /// Persist the signed-in user's id and serialized info.
    pub fn store_user(&self, user_id: &str, user_info_json: &str) -> Result<(), StoreError> {
        self.store.put(KEY_USER_ID, user_id)?;
        self.store.put(KEY_USER_INFO, user_info_json)?;
        Ok(())
    }

    /// Remove every stored credential. Used on sign-out and on refresh
    /// failure.
    pub fn clear_credentials(&self) -> Result<(), StoreError> {
        store::delete_all(self.store.as_ref())
    }

    /// Decide how a request that just saw a 401 should proceed.
    ///
    /// `used_token` is the bearer token the failed attempt carried. The flag
    /// check, the stale-token check, and waiter enqueueing happen under one
    /// lock so concurrent 401s reach a consistent leader/follower split.
    pub(crate) fn on_unauthorized(&self, used_token: Option<&str>) -> UnauthorizedAction {
        let mut state = self.refresh.lock().unwrap_or_else(|e| e.into_inner());

        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            return UnauthorizedAction::Wait(rx);
        }

        // Another task may have completed a refresh between this request
        // being sent and the 401 arriving. If the stored token differs from
        // the one the request used, just retry with the current one.
        if let Some(current) = self.access_token() {
            if used_token != Some(current.as_str()) {
                return UnauthorizedAction::Retry(current.to_string());
            }
        }

        state.in_progress = true;
        UnauthorizedAction::Lead
    }

    /// Settle a refresh attempt: release every queued waiter in arrival
    /// order with the outcome, then clear the in-progress flag.
    ///
    /// On failure the stored credentials are purged and the navigator is
    /// pointed at the login page. Returns the outcome for the leader.
    pub(crate) fn finish_refresh(
        &self,
        outcome: Result<String, AuthError>,
    ) -> Result<String, AuthError> {
        let waiters = {
            let mut state = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            // A waiter whose request future was dropped is fine to skip.
            let _ = waiter.send(outcome.clone());
        }

        if let Err(e) = &outcome {
            warn!("Token refresh failed: {}", e);
            if let Err(store_err) = self.clear_credentials() {
                warn!("Failed to clear credentials after refresh failure: {}", store_err);
            }
            self.navigator.to_login();
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNavigator(AtomicUsize);

    impl Navigator for CountingNavigator {
        fn to_login(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session_with_navigator() -> (Arc<Session>, Arc<CountingNavigator>) {
        let navigator = Arc::new(CountingNavigator(AtomicUsize::new(0)));
        let session = Arc::new(Session::new(
            Arc::new(MemoryStore::new()),
            navigator.clone(),
        ));
        (session, navigator)
    }

    fn tokens(access: &str, refresh: &str) -> Tokens {
        Tokens {
            access_token: access.into(),
            refresh_token: refresh.into(),
            expires_in: Some(3600),
        }
    }

    #[test]
    fn test_store_tokens_sets_expiry() {
        let (session, _) = session_with_navigator();
        session.store_tokens(&tokens("a", "r")).unwrap();

        assert_eq!(session.access_token().unwrap().as_str(), "a");
        assert_eq!(session.refresh_token().unwrap().as_str(), "r");

        let expires_at = session.token_expires_at().unwrap();
        assert!(expires_at > Utc::now().timestamp_millis());
        assert!(!session.is_token_expired());
    }

    #[test]
    fn test_missing_expiry_counts_as_expired() {
        let (session, _) = session_with_navigator();
        assert!(session.is_token_expired());
    }

    #[test]
    fn test_first_unauthorized_leads() {
        let (session, _) = session_with_navigator();
        session.store_tokens(&tokens("stale", "r")).unwrap();

        match session.on_unauthorized(Some("stale")) {
            UnauthorizedAction::Lead => {}
            _ => panic!("expected Lead"),
        }
    }

    #[test]
    fn test_second_unauthorized_waits() {
        let (session, _) = session_with_navigator();
        session.store_tokens(&tokens("stale", "r")).unwrap();

        assert!(matches!(
            session.on_unauthorized(Some("stale")),
            UnauthorizedAction::Lead
        ));
        assert!(matches!(
            session.on_unauthorized(Some("stale")),
            UnauthorizedAction::Wait(_)
        ));
    }

    #[test]
    fn test_stale_token_retries_without_refresh() {
        let (session, _) = session_with_navigator();
        session.store_tokens(&tokens("fresh", "r")).unwrap();

        match session.on_unauthorized(Some("stale")) {
            UnauthorizedAction::Retry(token) => assert_eq!(token, "fresh"),
            _ => panic!("expected Retry"),
        }
    }

    #[test]
    fn test_finish_refresh_releases_waiters_in_order() {
        let (session, _) = session_with_navigator();
        session.store_tokens(&tokens("stale", "r")).unwrap();

        assert!(matches!(
            session.on_unauthorized(Some("stale")),
            UnauthorizedAction::Lead
        ));

        let mut rx1 = match session.on_unauthorized(Some("stale")) {
            UnauthorizedAction::Wait(rx) => rx,
            _ => panic!("expected Wait"),
        };
        let mut rx2 = match session.on_unauthorized(Some("stale")) {
            UnauthorizedAction::Wait(rx) => rx,
            _ => panic!("expected Wait"),
        };

        let outcome = session.finish_refresh(Ok("new-token".to_string()));
        assert_eq!(outcome.unwrap(), "new-token");

        assert_eq!(rx1.try_recv().unwrap().unwrap(), "new-token");
        assert_eq!(rx2.try_recv().unwrap().unwrap(), "new-token");

        // Flag cleared: the next 401 with the current token leads again
        session.store_tokens(&tokens("new-token", "r")).unwrap();
        assert!(matches!(
            session.on_unauthorized(Some("new-token")),
            UnauthorizedAction::Lead
        ));
        session.finish_refresh(Ok("ignored".to_string())).unwrap();
    }

    #[test]
    fn test_failed_refresh_purges_and_navigates() {
        let (session, navigator) = session_with_navigator();
        session.store_tokens(&tokens("stale", "r")).unwrap();
        session.store_user("u1", "{}").unwrap();

        assert!(matches!(
            session.on_unauthorized(Some("stale")),
            UnauthorizedAction::Lead
        ));
        let mut rx = match session.on_unauthorized(Some("stale")) {
            UnauthorizedAction::Wait(rx) => rx,
            _ => panic!("expected Wait"),
        };

        let outcome =
            session.finish_refresh(Err(AuthError::RefreshFailed("HTTP 401".to_string())));
        assert!(outcome.is_err());
        assert!(rx.try_recv().unwrap().is_err());

        assert!(!session.has_credentials());
        assert!(session.user_id().is_none());
        assert_eq!(navigator.0.load(Ordering::SeqCst), 1);
    }
}
