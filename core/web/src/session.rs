//! In-memory browser sessions.
//!
//! A session is identified by a random id carried in the
//! [`SESSION_COOKIE`] cookie. It holds the pending OAuth2 state between
//! `/api/auth/start` and the callback, and the access token afterwards.
//! Nothing here is persisted.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use boxbridge_common::AccessToken;
use boxbridge_dropbox::Tokens;

use crate::state::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "boxbridge_session";

/// Opaque browser session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new unique session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its cookie value.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }

    /// Read the session id from a request's `Cookie` headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .find_map(|cookie| {
                cookie
                    .trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
            })
            .and_then(Self::parse)
    }

    /// `Set-Cookie` value binding the browser to this session.
    ///
    /// `secure` adds the `Secure` attribute, for deployments behind HTTPS.
    pub fn cookie(&self, secure: bool) -> String {
        let mut cookie = format!("{}={}; HttpOnly; Path=/; SameSite=Lax", SESSION_COOKIE, self.0);
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SessionEntry {
    tokens: Option<Tokens>,
    oauth_state: Option<String>,
    last_seen: DateTime<Utc>,
}

impl SessionEntry {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            tokens: None,
            oauth_state: None,
            last_seen: now,
        }
    }

    fn is_stale(&self, now: DateTime<Utc>, idle_ttl: Duration) -> bool {
        now - self.last_seen > idle_ttl
    }
}

/// What a request sees of its session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Live access token, if the user has authorized.
    pub access_token: Option<AccessToken>,
}

/// Session storage keyed by [`SessionId`].
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions expire after `idle_ttl` unused.
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Look up a session and mark it used.
    ///
    /// Stale sessions are evicted and reported as missing. An expired
    /// access token is dropped from the session.
    pub async fn touch(&self, id: SessionId) -> Option<SessionSnapshot> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let stale = sessions.get(&id)?.is_stale(now, self.idle_ttl);
        if stale {
            debug!(session = %id, "Evicting idle session");
            sessions.remove(&id);
            return None;
        }

        let entry = sessions.get_mut(&id)?;
        entry.last_seen = now;
        if entry.tokens.as_ref().is_some_and(Tokens::is_expired) {
            debug!(session = %id, "Dropping expired access token");
            entry.tokens = None;
        }

        Some(SessionSnapshot {
            access_token: entry.tokens.as_ref().map(|t| t.access_token.clone()),
        })
    }

    /// Remember the OAuth2 state for a session, creating one if needed.
    pub async fn begin_authorization(&self, id: Option<SessionId>, state: String) -> SessionId {
        let now = Utc::now();
        let id = id.unwrap_or_default();
        let mut sessions = self.sessions.write().await;

        let entry = sessions
            .entry(id)
            .or_insert_with(|| SessionEntry::fresh(now));
        entry.oauth_state = Some(state);
        entry.last_seen = now;

        id
    }

    /// Remove and return the pending OAuth2 state.
    pub async fn take_oauth_state(&self, id: SessionId) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&id)?.oauth_state.take()
    }

    /// Store tokens in a session, creating one if needed.
    pub async fn store_tokens(&self, id: Option<SessionId>, tokens: Tokens) -> SessionId {
        let now = Utc::now();
        let id = id.unwrap_or_default();
        let mut sessions = self.sessions.write().await;

        let entry = sessions
            .entry(id)
            .or_insert_with(|| SessionEntry::fresh(now));
        entry.tokens = Some(tokens);
        entry.last_seen = now;

        debug!(session = %id, "Access token stored in session");
        id
    }

    /// Evict every idle session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_stale(now, self.idle_ttl));
        before - sessions.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if no sessions are held.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Periodically purge idle sessions until the handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "Purged idle sessions");
                }
            }
        })
    }
}

/// The caller's session, resolved from the request cookie.
///
/// `id` is `None` when the request carries no cookie or refers to a
/// session that no longer exists.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub access_token: Option<AccessToken>,
    /// Mark a newly issued cookie `Secure`.
    pub secure_cookie: bool,
}

impl CurrentSession {
    /// Attach a `Set-Cookie` header when `assigned` is a new session.
    pub fn bind(&self, mut response: Response, assigned: SessionId) -> Response {
        if self.id == Some(assigned) {
            return response;
        }
        match HeaderValue::from_str(&assigned.cookie(self.secure_cookie)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to encode session cookie: {}", e),
        }
        response
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secure_cookie = state.config.secure_cookie;
        let anonymous = Self {
            secure_cookie,
            ..Self::default()
        };

        let Some(id) = SessionId::from_headers(&parts.headers) else {
            return Ok(anonymous);
        };

        Ok(match state.sessions.touch(id).await {
            Some(snapshot) => Self {
                id: Some(id),
                access_token: snapshot.access_token,
                secure_cookie,
            },
            None => anonymous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(secret: &str, expires_at: Option<DateTime<Utc>>) -> Tokens {
        Tokens {
            access_token: AccessToken::new(secret).unwrap(),
            token_type: "bearer".to_string(),
            expires_at,
            refresh_token: None,
            account_id: None,
            uid: None,
            scope: None,
        }
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let id = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; other=1", SESSION_COOKIE, id))
                .unwrap(),
        );

        assert_eq!(SessionId::from_headers(&headers), Some(id));
    }

    #[test]
    fn test_session_id_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("boxbridge_session=not-a-uuid"),
        );
        assert_eq!(SessionId::from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("boxbridge_session_other=123"),
        );
        assert_eq!(SessionId::from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = SessionId::new().cookie(false);
        assert!(cookie.starts_with("boxbridge_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));

        let cookie = SessionId::new().cookie(true);
        assert!(cookie.ends_with("; Secure"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_missing() {
        let store = SessionStore::new(Duration::hours(1));
        assert!(store.touch(SessionId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_store_and_read_token() {
        let store = SessionStore::new(Duration::hours(1));
        let id = store.store_tokens(None, tokens("sl.one", None)).await;

        let snapshot = store.touch(id).await.unwrap();
        assert_eq!(snapshot.access_token.unwrap().secret(), "sl.one");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(Duration::hours(1));
        let first = store.store_tokens(None, tokens("sl.first", None)).await;
        let second = store.begin_authorization(None, "state".to_string()).await;

        assert_ne!(first, second);
        assert!(store.touch(second).await.unwrap().access_token.is_none());
        assert_eq!(
            store.touch(first).await.unwrap().access_token.unwrap().secret(),
            "sl.first"
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_dropped() {
        let store = SessionStore::new(Duration::hours(1));
        let expired = tokens("sl.old", Some(Utc::now() - Duration::minutes(1)));
        let id = store.store_tokens(None, expired).await;

        let snapshot = store.touch(id).await.unwrap();
        assert!(snapshot.access_token.is_none());
    }

    #[tokio::test]
    async fn test_oauth_state_is_consumed() {
        let store = SessionStore::new(Duration::hours(1));
        let id = store.begin_authorization(None, "xyz".to_string()).await;

        assert_eq!(store.take_oauth_state(id).await.as_deref(), Some("xyz"));
        assert_eq!(store.take_oauth_state(id).await, None);
    }

    #[tokio::test]
    async fn test_existing_session_is_reused() {
        let store = SessionStore::new(Duration::hours(1));
        let id = store.begin_authorization(None, "s1".to_string()).await;
        let same = store.store_tokens(Some(id), tokens("sl.tok", None)).await;

        assert_eq!(id, same);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::zero());
        let id = store.store_tokens(None, tokens("sl.tok", None)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
        assert!(store.touch(id).await.is_none());
    }

    #[test]
    fn test_bind_sets_cookie_only_for_new_sessions() {
        let id = SessionId::new();
        let current = CurrentSession {
            id: Some(id),
            access_token: None,
            secure_cookie: false,
        };
        let response = current.bind(Response::default(), id);
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let anonymous = CurrentSession::default();
        let response = anonymous.bind(Response::default(), id);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains(&id.to_string()));
        assert!(!cookie.to_str().unwrap().contains("Secure"));

        let secure = CurrentSession {
            secure_cookie: true,
            ..CurrentSession::default()
        };
        let response = secure.bind(Response::default(), id);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().ends_with("; Secure"));
    }
}
