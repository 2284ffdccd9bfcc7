//! Shared wire model for the LifeOS auth boundary.
//!
//! This crate owns the JSON shapes exchanged between `server` and `client`,
//! the endpoint and cookie names, and the route policy both sides apply when
//! deciding redirects. Keeping the policy here means the server middleware and
//! the client route guard cannot drift apart.

pub mod routes;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Name of the HTTP-only cookie that carries the signed session token.
pub const SESSION_COOKIE: &str = "lifeos_session_token";

pub const SESSION_PATH: &str = "/api/auth/session";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const SIGNUP_PATH: &str = "/api/auth/signup";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ADMIN_USERS_PATH: &str = "/api/admin/users";

/// Passwords shorter than this are rejected at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// PAYLOADS
// =============================================================================

/// Non-authoritative copy of the signed-in user, as returned by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

/// Body of `POST /api/auth/login` and `POST /api/auth/signup`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response of `GET /api/auth/session`. `user` is `null` when no valid
/// session cookie was presented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub message: String,
}

/// Response of the credential endpoints. Failures carry only `message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// Plain `{ "message": ... }` body used by logout and error responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Body returned when a protected API path is requested without a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnauthorizedResponse {
    pub message: String,
    pub redirect_to: String,
}

/// Sanitized user row exposed by the admin listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// Response of `GET /api/admin/users`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUser>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
