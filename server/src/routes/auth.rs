//! Auth routes: credential login and signup, session probe, logout.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use protocol::{AuthResponse, Credentials, MessageResponse, SESSION_COOKIE, SessionResponse, SessionUser};
use time::Duration;

use super::error::ApiError;
use crate::services::accounts;
use crate::services::session::{Session, SessionError};
use crate::services::users::User;
use crate::state::AppState;

// =============================================================================
// COOKIES
// =============================================================================

/// HTTP-only session cookie valid for `max_age`.
pub(crate) fn session_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

/// Expired, empty session cookie that makes the browser drop it.
pub(crate) fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    session_cookie(String::new(), Duration::ZERO, secure)
}

fn cookie_token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE).map(Cookie::value).filter(|token| !token.is_empty())
}

/// Verify the session cookie, if any. Invalid and expired tokens read as
/// "no session".
pub(crate) fn session_from_jar(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let token = cookie_token(jar)?;
    match state.sessions.verify(token) {
        Ok(session) => Some(session),
        Err(SessionError::Expired) => {
            tracing::debug!("session cookie expired");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "session cookie rejected");
            None
        }
    }
}

fn session_user(user: &User) -> SessionUser {
    SessionUser { id: user.id, email: user.email.clone() }
}

fn parse_credentials(body: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    body.map(|Json(creds)| creds)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Session extracted from the cookie. Use as a handler parameter to require
/// authentication.
pub struct AuthUser {
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        session_from_jar(&app_state, &jar)
            .map(|session| Self { session })
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/auth/session`: report the user behind the cookie, or `null`.
///
/// The account must still exist; a valid token for a deleted user reads as
/// no session. A stale or invalid cookie is cleared.
pub async fn session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let no_session = || SessionResponse { user: None, message: "No active session".into() };

    let Some(session) = session_from_jar(&state, &jar) else {
        let jar = if cookie_token(&jar).is_some() { jar.add(cleared_session_cookie(state.auth.cookie_secure)) } else { jar };
        return Ok((jar, Json(no_session())));
    };

    if state.users.find_by_id(session.user_id).await?.is_none() {
        tracing::warn!(user_id = %session.user_id, "session for missing user");
        let jar = jar.add(cleared_session_cookie(state.auth.cookie_secure));
        return Ok((jar, Json(no_session())));
    }

    Ok((jar, Json(SessionResponse { user: Some(session.user()), message: "Session active".into() })))
}

/// `POST /api/auth/login`: check credentials, set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let creds = parse_credentials(body)?;
    let user = accounts::log_in(state.users.as_ref(), state.passwords, &creds).await?;

    let issued = state
        .sessions
        .issue(user.id, &user.email)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!(user_id = %user.id, "login succeeded");

    let jar = jar.add(session_cookie(issued.token, state.sessions.ttl(), state.auth.cookie_secure));
    Ok((jar, Json(AuthResponse { message: "Login successful!".into(), user: Some(session_user(&user)) })))
}

/// `POST /api/auth/signup`: create the account and sign it in.
///
/// If the account is created but the session cannot be issued, the response
/// is still `201`, without a cookie or `user`, so the caller falls back to
/// logging in.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let creds = parse_credentials(body)?;
    let user = accounts::sign_up(state.users.as_ref(), state.passwords, &creds).await?;

    match state.sessions.issue(user.id, &user.email) {
        Ok(issued) => {
            let jar = jar.add(session_cookie(issued.token, state.sessions.ttl(), state.auth.cookie_secure));
            let body = AuthResponse { message: "User created successfully!".into(), user: Some(session_user(&user)) };
            Ok((StatusCode::CREATED, jar, Json(body)))
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "session issue failed after signup");
            let body = AuthResponse {
                message: "Account created but automatic login failed. Please try logging in.".into(),
                user: None,
            };
            Ok((StatusCode::CREATED, jar, Json(body)))
        }
    }
}

/// `POST /api/auth/logout`: clear the session cookie. Always succeeds.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    if let Some(session) = session_from_jar(&state, &jar) {
        tracing::info!(user_id = %session.user_id, "logout");
    }
    let jar = jar.add(cleared_session_cookie(state.auth.cookie_secure));
    (jar, Json(MessageResponse::new("Logout successful")))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
