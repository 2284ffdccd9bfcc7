//! Admin routes.

use axum::extract::State;
use axum::response::Json;
use protocol::AdminUsersResponse;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::services::users::User;
use crate::state::AppState;

/// `GET /api/admin/users`: list every account without password hashes.
/// Only the configured admin email may call it.
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Result<Json<AdminUsersResponse>, ApiError> {
    if !state.auth.is_admin(&auth.session.email) {
        tracing::warn!(user_id = %auth.session.user_id, "non-admin requested user list");
        return Err(ApiError::Forbidden);
    }

    let users = state.users.list().await?;
    Ok(Json(AdminUsersResponse { users: users.iter().map(User::to_admin).collect() }))
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
