//! Cookie-keyed conversation store.
//!
//! Each browser gets a `regassist_session` cookie holding a UUID v7. The
//! store maps that id to the browser's own [`Conversation`]. State lives in
//! process memory and is lost on restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use regassist_core::Conversation;

pub const SESSION_COOKIE: &str = "regassist_session";

/// One session's conversation. Held across the completion call, so
/// concurrent requests from the same browser are answered one at a time.
pub type SessionHandle = Arc<AsyncMutex<Conversation>>;

/// Session resolved for one request.
pub struct Session {
    pub id: Uuid,
    pub conversation: SessionHandle,
    /// The id was minted for this request and must be sent back as a cookie.
    pub is_new: bool,
}

impl Session {
    /// `Set-Cookie` value for a newly minted session.
    pub fn cookie(&self) -> Option<HeaderValue> {
        if !self.is_new {
            return None;
        }
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/",
            self.id
        ))
        .ok()
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session named by the request cookie, or start a new one.
    ///
    /// Ids the store does not know (expired by a restart, or forged) are
    /// replaced rather than adopted.
    pub fn resolve(&self, headers: &HeaderMap) -> Session {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(id) = session_id(headers) {
            if let Some(conversation) = sessions.get(&id) {
                return Session {
                    id,
                    conversation: Arc::clone(conversation),
                    is_new: false,
                };
            }
        }

        let id = Uuid::now_v7();
        let conversation = Arc::new(AsyncMutex::new(Conversation::new()));
        sessions.insert(id, Arc::clone(&conversation));
        tracing::debug!(session = %id, "session started");

        Session {
            id,
            conversation,
            is_new: true,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Extract the session id from the `Cookie` headers.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn new_session_sets_cookie() {
        let store = SessionStore::new();
        let session = store.resolve(&HeaderMap::new());

        assert!(session.is_new);
        assert_eq!(store.len(), 1);
        let cookie = session.cookie().unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}={}", session.id)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn known_cookie_reuses_session() {
        let store = SessionStore::new();
        let first = store.resolve(&HeaderMap::new());

        let headers = cookie_headers(&format!("theme=dark; {SESSION_COOKIE}={}", first.id));
        let second = store.resolve(&headers);

        assert!(!second.is_new);
        assert!(second.cookie().is_none());
        assert_eq!(second.id, first.id);
        assert!(Arc::ptr_eq(&first.conversation, &second.conversation));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_or_malformed_cookie_starts_fresh() {
        let store = SessionStore::new();
        let stranger = Uuid::now_v7();

        let session = store.resolve(&cookie_headers(&format!("{SESSION_COOKIE}={stranger}")));
        assert!(session.is_new);
        assert_ne!(session.id, stranger);

        let session = store.resolve(&cookie_headers(&format!("{SESSION_COOKIE}=not-a-uuid")));
        assert!(session.is_new);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.resolve(&HeaderMap::new());
        let b = store.resolve(&HeaderMap::new());

        assert_ne!(a.id, b.id);
        assert!(!Arc::ptr_eq(&a.conversation, &b.conversation));
    }
}
