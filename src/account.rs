//! Signed-in account, persisted across launches in the local store.

use chrono::Utc;
use nightly_ritual_auth::{Auth, Session};
use std::sync::Arc;

use crate::cache::{KeyValueStore, AUTH_SESSION};
use crate::context::SessionContext;
use crate::error::{Error, Result};

pub struct AuthManager {
    auth: Auth,
    cache: Arc<dyn KeyValueStore>,
}

impl AuthManager {
    pub fn new(auth: Auth, cache: Arc<dyn KeyValueStore>) -> Self {
        Self { auth, cache }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Loads the saved session, refreshing it when it has expired.
    ///
    /// An unreadable or unrefreshable session is dropped and the user is
    /// treated as signed out.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let raw = match self.cache.get(AUTH_SESSION).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable saved session");
                self.cache.remove(AUTH_SESSION).await?;
                return Ok(None);
            }
        };

        self.auth.set_session(Some(session.clone()));
        if !session.is_expired_at(Utc::now().timestamp()) {
            tracing::debug!(user_id = %session.user.id, "restored saved session");
            return Ok(Some(session));
        }

        match self.auth.refresh_session().await {
            Ok(fresh) => {
                self.persist(&fresh).await?;
                tracing::info!(user_id = %fresh.user.id, "refreshed expired session");
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!(error = %e, "saved session could not be refreshed");
                self.auth.set_session(None);
                self.cache.remove(AUTH_SESSION).await?;
                Ok(None)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.persist(&session).await?;
        tracing::info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_up(email, password).await?;
        self.persist(&session).await?;
        tracing::info!(user_id = %session.user.id, "account created");
        Ok(session)
    }

    /// Signs out. The saved session is removed even if the server call fails.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!(error = %e, "server sign out failed");
        }
        self.cache.remove(AUTH_SESSION).await
    }

    pub fn context(&self) -> Result<SessionContext> {
        self.auth
            .get_session()
            .map(|session| SessionContext::new(session.user.id, session.access_token))
            .ok_or(Error::NotSignedIn)
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        self.cache.set(AUTH_SESSION, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use nightly_ritual_auth::AuthOptions;
    use reqwest::Client;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body(token: &str, expires_at: i64) -> Value {
        json!({
            "access_token": token,
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "expires_at": expires_at,
            "token_type": "bearer",
            "user": { "id": "u-1", "email": "sam@example.com" }
        })
    }

    fn manager(server: &MockServer, cache: Arc<MemoryStore>) -> AuthManager {
        let auth = Auth::new(&server.uri(), "anon", Client::new(), AuthOptions::default());
        AuthManager::new(auth, cache)
    }

    #[tokio::test]
    async fn login_persists_and_restore_reuses() {
        let server = MockServer::start().await;
        let future = Utc::now().timestamp() + 3600;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("jwt-1", future)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(MemoryStore::new());
        let first = manager(&server, cache.clone());
        first.login("sam@example.com", "pw").await.unwrap();
        assert_eq!(first.context().unwrap(), SessionContext::new("u-1", "jwt-1"));

        let relaunched = manager(&server, cache);
        assert!(relaunched.context().is_err());
        let restored = relaunched.restore().await.unwrap().unwrap();
        assert_eq!(restored.access_token, "jwt-1");
        assert_eq!(relaunched.context().unwrap().user_id, "u-1");
    }

    #[tokio::test]
    async fn expired_session_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(session_body("jwt-2", Utc::now().timestamp() + 3600)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(MemoryStore::new());
        cache
            .set(AUTH_SESSION, &session_body("jwt-old", 1).to_string())
            .await
            .unwrap();

        let manager = manager(&server, cache.clone());
        let session = manager.restore().await.unwrap().unwrap();
        assert_eq!(session.access_token, "jwt-2");
        let saved = cache.get(AUTH_SESSION).await.unwrap().unwrap();
        assert!(saved.contains("jwt-2"));
    }

    #[tokio::test]
    async fn logout_forgets_session_even_when_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cache = Arc::new(MemoryStore::new());
        cache
            .set(
                AUTH_SESSION,
                &session_body("jwt-1", Utc::now().timestamp() + 3600).to_string(),
            )
            .await
            .unwrap();

        let manager = manager(&server, cache.clone());
        manager.restore().await.unwrap();
        manager.logout().await.unwrap();

        assert!(cache.get(AUTH_SESSION).await.unwrap().is_none());
        assert!(matches!(manager.context(), Err(Error::NotSignedIn)));
    }

    #[tokio::test]
    async fn garbage_session_is_discarded() {
        let server = MockServer::start().await;
        let cache = Arc::new(MemoryStore::new());
        cache.set(AUTH_SESSION, "{not json").await.unwrap();

        let manager = manager(&server, cache.clone());
        assert!(manager.restore().await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }
}
