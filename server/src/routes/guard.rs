//! Route guard middleware.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs in front of every route, including the static front-end fallback.
//! The decision itself comes from `protocol::routes`, the same policy the
//! client-side guard applies, so both ends agree on where a visitor belongs.
//!
//! Besides redirects, the guard keeps sessions sliding: a valid session
//! close to expiry gets a freshly signed cookie on the way out, provided its
//! account still exists.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use protocol::UnauthorizedResponse;
use protocol::routes::{LOGIN_ROUTE, RouteKind, classify, redirect_for};
use time::OffsetDateTime;

use super::auth::{cleared_session_cookie, session_cookie, session_from_jar};
use crate::state::AppState;

pub async fn route_guard(State(state): State<AppState>, jar: CookieJar, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let kind = classify(&path);
    if kind == RouteKind::Public {
        return next.run(request).await;
    }

    let session = session_from_jar(&state, &jar);

    if kind == RouteKind::ProtectedApi && session.is_none() {
        tracing::debug!(%path, "unauthenticated api request");
        let body = UnauthorizedResponse { message: "Authentication required".into(), redirect_to: LOGIN_ROUTE.into() };
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }
    if let Some(target) = redirect_for(&path, session.is_some()) {
        tracing::debug!(%path, %target, "route guard redirect");
        return Redirect::to(target).into_response();
    }

    let response = next.run(request).await;

    let Some(session) = session else {
        return response;
    };
    if !session.expires_within(state.auth.refresh_window, OffsetDateTime::now_utc()) {
        return response;
    }
    let email = match state.users.find_by_id(session.user_id).await {
        Ok(Some(user)) => user.email,
        Ok(None) => {
            tracing::debug!(user_id = %session.user_id, "session user gone; clearing cookie");
            let jar = CookieJar::new().add(cleared_session_cookie(state.auth.cookie_secure));
            return (jar, response).into_response();
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "session refresh lookup failed");
            return response;
        }
    };
    match state.sessions.issue(session.user_id, &email) {
        Ok(issued) => {
            tracing::debug!(user_id = %session.user_id, "refreshing session cookie");
            let jar = CookieJar::new().add(session_cookie(issued.token, state.sessions.ttl(), state.auth.cookie_secure));
            (jar, response).into_response()
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "session refresh failed");
            response
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
