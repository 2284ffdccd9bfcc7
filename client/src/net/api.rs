//! HTTP client for the auth endpoints.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx answers become [`ClientError::Rejected`] carrying the server's
//! `message`, so callers can show it verbatim. Transport and decode failures
//! surface as [`ClientError::Http`]. The store treats both the same way.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use async_trait::async_trait;
use protocol::{
    ADMIN_USERS_PATH, AdminUser, AdminUsersResponse, AuthResponse, Credentials, LOGIN_PATH, LOGOUT_PATH,
    MessageResponse, SESSION_COOKIE, SESSION_PATH, SIGNUP_PATH, SessionResponse, SessionUser,
};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Response, StatusCode, Url};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
}

impl ClientError {
    /// Text suitable for an error notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Http(_) => "Unable to reach the server. Please try again.".to_owned(),
            Self::InvalidBaseUrl(_) => "Client is misconfigured.".to_owned(),
        }
    }

    /// HTTP status of a rejected request.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The calls the auth store makes against the server.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// `GET /api/auth/session`. `Ok(None)` means no active session.
    async fn session(&self) -> Result<Option<SessionUser>, ClientError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError>;

    async fn signup(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;

    async fn list_users(&self) -> Result<Vec<AdminUser>, ClientError>;
}

// =============================================================================
// REQWEST BACKEND
// =============================================================================

/// [`SessionBackend`] over HTTP with a cookie jar holding the session cookie,
/// the way a browser would.
pub struct HttpSessionBackend {
    base_url: Url,
    jar: Arc<Jar>,
    http: reqwest::Client,
}

impl HttpSessionBackend {
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when `base_url` does not parse
    /// and [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        // Endpoints join below the base path, which needs the trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder().cookie_provider(Arc::clone(&jar)).build()?;
        Ok(Self { base_url, jar, http })
    }

    /// Seed the jar with a session token obtained elsewhere.
    pub fn set_session_token(&self, token: &str) {
        self.jar.add_cookie_str(&format!("{SESSION_COOKIE}={token}; Path=/"), &self.base_url);
    }

    /// Current session token, if the jar holds a non-empty one.
    #[must_use]
    pub fn session_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_owned())
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url.join(path.trim_start_matches('/')).map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))
    }
}

/// Turn a non-success response into [`ClientError::Rejected`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<MessageResponse>()
        .await
        .map(|body| body.message)
        .unwrap_or_else(|_| rejected_fallback(status));
    Err(ClientError::Rejected { status: status.as_u16(), message })
}

fn rejected_fallback(status: StatusCode) -> String {
    format!("Request failed with status {}", status.as_u16())
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn session(&self) -> Result<Option<SessionUser>, ClientError> {
        let response = self.http.get(self.url(SESSION_PATH)?).send().await?;
        let body: SessionResponse = check(response).await?.json().await?;
        Ok(body.user)
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        let response = self.http.post(self.url(LOGIN_PATH)?).json(credentials).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn signup(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        let response = self.http.post(self.url(SIGNUP_PATH)?).json(credentials).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let response = self.http.post(self.url(LOGOUT_PATH)?).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<AdminUser>, ClientError> {
        let response = self.http.get(self.url(ADMIN_USERS_PATH)?).send().await?;
        let body: AdminUsersResponse = check(response).await?.json().await?;
        Ok(body.users)
    }
}
