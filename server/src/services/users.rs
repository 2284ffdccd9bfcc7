//! User persistence.
//!
//! DESIGN
//! ======
//! Handlers only see the [`UserStore`] trait. [`PgUserStore`] is the
//! production backend; [`MemoryUserStore`] backs development runs without
//! `DATABASE_URL` and every test that needs accounts.
//!
//! Emails are normalized (trimmed, lowercased) before they reach a store, so
//! uniqueness is case-insensitive in both backends.

use async_trait::async_trait;
use protocol::AdminUser;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("a user with this email already exists")]
    Conflict,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// A persisted account.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Sanitized view for the admin listing; drops the password hash.
    #[must_use]
    pub fn to_admin(&self) -> AdminUser {
        AdminUser {
            id: self.id,
            email: self.email.clone(),
            created_at: self
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.created_at.unix_timestamp().to_string()),
        }
    }
}

/// Trim, lowercase and sanity-check an email address.
///
/// Accepts `local@domain.tld` shapes only: one `@`, non-empty local part, and
/// a domain with a dot that is neither leading nor trailing.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.contains('@') || local.contains(char::is_whitespace) {
        return None;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return None;
    }
    Some(normalized)
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Account storage. Emails passed in are already normalized.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError>;

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Conflict`] when the email is taken.
    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, UserStoreError>;

    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<User>, UserStoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        let row = sqlx::query("SELECT id, email, password_hash, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, UserStoreError> {
        let row = sqlx::query(
            r"INSERT INTO users (id, email, password_hash)
              VALUES ($1, $2, $3)
              RETURNING id, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => UserStoreError::Conflict,
            other => UserStoreError::Db(other),
        })?;
        Ok(user_from_row(&row))
    }

    async fn list(&self) -> Result<Vec<User>, UserStoreError> {
        let rows = sqlx::query("SELECT id, email, password_hash, created_at FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local store. Accounts vanish on restart.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, UserStoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(UserStoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, UserStoreError> {
        Ok(self.users.read().await.clone())
    }
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
