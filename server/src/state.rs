//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the user store, the session signing keys, the password hasher
//! and the auth settings. Clone is required by Axum; every field is cheap to
//! clone (`Arc` or small `Copy` data).

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::services::password::PasswordService;
use crate::services::session::SessionKeys;
use crate::services::users::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionKeys,
    pub passwords: PasswordService,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, auth: AuthConfig, passwords: PasswordService) -> Self {
        let sessions = SessionKeys::new(&auth.jwt_secret, auth.session_ttl);
        Self { users, sessions, passwords, auth: Arc::new(auth) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
