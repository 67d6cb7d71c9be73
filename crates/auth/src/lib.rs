//! Auth client for nightly-ritual
//!
//! Talks to the hosted GoTrue endpoints for email/password accounts: sign up,
//! sign in, current user lookup, token refresh and sign out. The current
//! session is held in memory; persisting it across launches is the caller's
//! job (see `set_session`).

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,
}

/// Account as returned by the auth server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix seconds; older servers omit it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: User,
}

impl Session {
    /// True when `expires_at` is known and not later than `now_unix`.
    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        self.expires_at.map(|at| at <= now_unix).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Keep the session returned by sign up / sign in as the current session.
    pub persist_session: bool,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
}

impl Auth {
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.current_session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.current_session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn keep(&self, session: &Session) {
        if self.options.persist_session {
            *self.write_session() = Some(session.clone());
        }
    }

    async fn send_for_session(&self, request: RequestBuilder) -> Result<Session, AuthError> {
        let response = request
            .header("apikey", &self.key)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            log::warn!("auth request rejected: {}", error_text);
            return Err(AuthError::ApiError(error_text));
        }

        let session: Session = response.json().await?;
        self.keep(&session);
        Ok(session)
    }

    /// Registers a new account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let request = self
            .http_client
            .post(self.endpoint("/signup"))
            .json(&PasswordCredentials { email, password });
        self.send_for_session(request).await
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let request = self
            .http_client
            .post(self.endpoint("/token?grant_type=password"))
            .json(&PasswordCredentials { email, password });
        self.send_for_session(request).await
    }

    pub fn get_session(&self) -> Option<Session> {
        self.read_session().clone()
    }

    /// Installs a session restored from local storage.
    pub fn set_session(&self, session: Option<Session>) {
        *self.write_session() = session;
    }

    /// Fetches the account behind the current access token.
    pub async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let response = self
            .http_client
            .get(self.endpoint("/user"))
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }

        Ok(response.json::<User>().await?)
    }

    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let request = self
            .http_client
            .post(self.endpoint("/token?grant_type=refresh_token"))
            .json(&serde_json::json!({ "refresh_token": session.refresh_token }));
        self.send_for_session(request).await
    }

    /// Revokes the current session server-side and forgets it locally.
    ///
    /// The local session is cleared even when the server call fails, so a
    /// stale token never outlives a sign out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;
        self.set_session(None);

        let response = self
            .http_client
            .post(self.endpoint("/logout"))
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::ApiError(error_text));
        }

        Ok(())
    }
}
