//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON auth API and, when a front-end build is
//! configured, serves it as a single-page app from the fallback. The route
//! guard wraps everything, so pages and API share one access policy.

pub mod admin;
pub mod auth;
pub mod error;
pub mod guard;

#[cfg(test)]
pub(crate) mod test_server;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use protocol::{ADMIN_USERS_PATH, LOGIN_PATH, LOGOUT_PATH, MessageResponse, SESSION_PATH, SIGNUP_PATH};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router. `web_dir` holds the built front-end; when
/// absent, unknown paths answer `404`.
pub fn app(state: AppState, web_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route(SESSION_PATH, get(auth::session))
        .route(LOGIN_PATH, post(auth::login))
        .route(SIGNUP_PATH, post(auth::signup))
        .route(LOGOUT_PATH, post(auth::logout))
        .route(ADMIN_USERS_PATH, get(admin::list_users))
        .route("/healthz", get(healthz));

    let router = match web_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            router.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => router.fallback(not_found),
    };

    router
        .layer(middleware::from_fn_with_state(state.clone(), guard::route_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(MessageResponse::new("Not found"))).into_response()
}
