//! Signup and credential checks.
//!
//! Password hashing is CPU-bound, so both hashing and verification run on
//! the blocking pool.

use protocol::{Credentials, MIN_PASSWORD_LEN};

use super::password::{PasswordError, PasswordService};
use super::users::{User, UserStore, UserStoreError, normalize_email};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Please provide a valid email address")]
    InvalidEmail,
    #[error("Password must be at least {min} characters long", min = MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("User with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("user store error: {0}")]
    Store(UserStoreError),
    #[error("password error: {0}")]
    Password(#[from] PasswordError),
    #[error("password worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<UserStoreError> for AccountError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::Conflict => Self::EmailTaken,
            other => Self::Store(other),
        }
    }
}

fn require_fields(creds: &Credentials) -> Result<(), AccountError> {
    if creds.email.trim().is_empty() || creds.password.is_empty() {
        return Err(AccountError::MissingCredentials);
    }
    Ok(())
}

/// Create an account.
///
/// # Errors
///
/// Returns a validation variant for bad input, [`AccountError::EmailTaken`]
/// for duplicates, and store/hash failures otherwise.
pub async fn sign_up(
    store: &dyn UserStore,
    passwords: PasswordService,
    creds: &Credentials,
) -> Result<User, AccountError> {
    require_fields(creds)?;
    let email = normalize_email(&creds.email).ok_or(AccountError::InvalidEmail)?;
    if creds.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::PasswordTooShort);
    }
    if store.find_by_email(&email).await?.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let password = creds.password.clone();
    let hash = tokio::task::spawn_blocking(move || passwords.hash(&password)).await??;

    let user = store.insert(&email, &hash).await?;
    tracing::info!(user_id = %user.id, "account created");
    Ok(user)
}

/// Check credentials and return the matching account.
///
/// Unknown emails, malformed emails and wrong passwords all produce
/// [`AccountError::InvalidCredentials`].
///
/// # Errors
///
/// Returns [`AccountError::MissingCredentials`] for empty input and
/// store/hash failures otherwise.
pub async fn log_in(
    store: &dyn UserStore,
    passwords: PasswordService,
    creds: &Credentials,
) -> Result<User, AccountError> {
    require_fields(creds)?;
    let Some(email) = normalize_email(&creds.email) else {
        return Err(AccountError::InvalidCredentials);
    };
    let Some(user) = store.find_by_email(&email).await? else {
        tracing::debug!("login for unknown email");
        return Err(AccountError::InvalidCredentials);
    };

    let password = creds.password.clone();
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || passwords.verify(&password, &hash)).await??;
    if !valid {
        tracing::debug!(user_id = %user.id, "login with wrong password");
        return Err(AccountError::InvalidCredentials);
    }
    Ok(user)
}

#[cfg(test)]
#[path = "accounts_test.rs"]
mod tests;
