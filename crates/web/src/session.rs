//! Cookie-based session handling on top of a [`SessionStore`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use http::HeaderMap;
use http::header::SET_COOKIE;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use plinth_headers::{CookieError, SetCookie};
use plinth_session::{Session, SessionStore, StoreError};

use crate::request::RequestHeader;

const DEFAULT_COOKIE_NAME: &str = "session";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cookie(#[from] CookieError),

    #[error("session cookie is not a valid header value")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
}

/// Resolves the session cookie against a store and writes dirty sessions
/// back, emitting the `Set-Cookie` header.
///
/// A missing, unparseable or expired session cookie yields a fresh session;
/// only sessions that were actually modified are persisted.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    lifetime: Duration,
    secure: bool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name)
            .field("lifetime", &self.lifetime)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, lifetime: Duration) -> Self {
        Self { store, cookie_name: DEFAULT_COOKIE_NAME.to_string(), lifetime, secure: false }
    }

    /// Use a different cookie name. Validated eagerly, the same way
    /// [`SetCookie`] validates names.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Result<Self, CookieError> {
        let name = name.into();
        SetCookie::new(&name, "")?;
        self.cookie_name = name;
        Ok(self)
    }

    /// Mark emitted cookies `Secure`.
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// The session for this request: loaded from the store when the cookie
    /// references a live session, fresh otherwise.
    pub async fn session_for(&self, header: &RequestHeader) -> Result<Session, SessionError> {
        if let Some(value) = header.cookie(&self.cookie_name) {
            match Uuid::parse_str(value) {
                Ok(id) => {
                    if let Some(session) = self.store.load(id).await? {
                        return Ok(session);
                    }
                    debug!(%id, "session cookie references no live session");
                }
                Err(_) => debug!("unparseable session cookie"),
            }
        }

        Ok(Session::new(Utc::now() + self.lifetime))
    }

    /// Persist the session if it changed and append the `Set-Cookie` header.
    /// A clean session writes nothing.
    pub async fn save(&self, session: &mut Session, headers: &mut HeaderMap) -> Result<(), SessionError> {
        if !session.is_dirty() {
            return Ok(());
        }

        self.store.save(session).await?;
        session.mark_clean();

        let mut cookie = SetCookie::new(&self.cookie_name, session.id().to_string())?
            .path("/")?
            .expires(session.expires())
            .http_only();
        if self.secure {
            cookie = cookie.secure();
        }
        headers.append(SET_COOKIE, cookie.to_string().parse()?);
        Ok(())
    }

    /// Remove expired sessions from the store.
    pub async fn purge_expired_sessions(&self) -> Result<(), SessionError> {
        self.store.purge_expired_sessions().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::Request;
    use http::header::COOKIE;
    use serde_json::json;

    use plinth_session::MemoryStore;

    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryStore::default()), Duration::hours(1))
    }

    fn header_with_cookie(cookie: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0.into()
    }

    #[tokio::test]
    async fn no_cookie_yields_a_fresh_session() {
        let session = manager().session_for(&header_with_cookie(None)).await.unwrap();
        assert!(session.is_dirty());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn garbage_cookie_yields_a_fresh_session() {
        let session = manager().session_for(&header_with_cookie(Some("session=not-a-uuid"))).await.unwrap();
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn save_and_reload_through_the_cookie() {
        let manager = manager();
        let mut session = manager.session_for(&header_with_cookie(None)).await.unwrap();
        session.insert("user", "alice");

        let mut headers = HeaderMap::new();
        manager.save(&mut session, &mut headers).await.unwrap();
        assert!(!session.is_dirty());

        let set_cookie = headers[SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.starts_with(&format!("session={}", session.id())), "{set_cookie}");
        assert!(set_cookie.contains("; Path=/"), "{set_cookie}");
        assert!(set_cookie.contains("; HttpOnly"), "{set_cookie}");
        assert!(!set_cookie.contains("; Secure"), "{set_cookie}");

        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();
        let reloaded = manager.session_for(&header_with_cookie(Some(&cookie_pair))).await.unwrap();
        assert_eq!(reloaded.id(), session.id());
        assert_eq!(reloaded.get("user"), Some(&json!("alice")));
        assert!(!reloaded.is_dirty());
    }

    #[tokio::test]
    async fn clean_session_writes_nothing() {
        let manager = manager();
        let mut session = manager.session_for(&header_with_cookie(None)).await.unwrap();
        session.mark_clean();

        let mut headers = HeaderMap::new();
        manager.save(&mut session, &mut headers).await.unwrap();
        assert!(headers.get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn secure_manager_marks_the_cookie() {
        let manager = manager().secure();
        let mut session = manager.session_for(&header_with_cookie(None)).await.unwrap();
        session.insert("k", 1);

        let mut headers = HeaderMap::new();
        manager.save(&mut session, &mut headers).await.unwrap();
        assert!(headers[SET_COOKIE].to_str().unwrap().contains("; Secure"));
    }

    #[tokio::test]
    async fn custom_cookie_names_are_validated() {
        assert!(manager().with_cookie_name("sid").is_ok());
        assert!(manager().with_cookie_name("bad name").is_err());
    }
}
