//! Signed session tokens.
//!
//! ARCHITECTURE
//! ============
//! A session is an HS256 JWT carried in the `lifeos_session_token` cookie.
//! The server keeps no session table: the signature and `exp` claim are the
//! whole proof, so logout only has to clear the cookie.
//!
//! TRADE-OFFS
//! ==========
//! Stateless tokens cannot be revoked before expiry. The route guard re-issues
//! tokens close to expiry, which gives a sliding session without a store.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use protocol::SessionUser;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("session token expired")]
    Expired,
    #[error("invalid session token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("session token carries an out-of-range expiry")]
    BadExpiry,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    iat: i64,
    exp: i64,
}

/// A verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: OffsetDateTime,
}

impl Session {
    #[must_use]
    pub fn user(&self) -> SessionUser {
        SessionUser { id: self.user_id, email: self.email.clone() }
    }

    /// True when the session ends within `window` of `now`.
    #[must_use]
    pub fn expires_within(&self, window: Duration, now: OffsetDateTime) -> bool {
        self.expires_at - now < window
    }
}

/// A freshly signed token and the session it encodes.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Signing and verification keys plus the session lifetime.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self { encoding: EncodingKey::from_secret(secret), decoding: DecodingKey::from_secret(secret), ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a session starting now.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Sign`] if encoding fails.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<IssuedSession, SessionError> {
        self.issue_at(user_id, email, OffsetDateTime::now_utc())
    }

    /// Issue a session as if signed at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Sign`] if encoding fails and
    /// [`SessionError::BadExpiry`] if `now + ttl` is out of range.
    pub fn issue_at(&self, user_id: Uuid, email: &str, now: OffsetDateTime) -> Result<IssuedSession, SessionError> {
        let expires_at = now.checked_add(self.ttl).ok_or(SessionError::BadExpiry)?;
        let claims = Claims {
            sub: user_id,
            email: email.to_owned(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Sign)?;
        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| SessionError::BadExpiry)?;
        Ok(IssuedSession { token, session: Session { user_id, email: claims.email, expires_at } })
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Expired`] for expired tokens and
    /// [`SessionError::Invalid`] for anything else that fails validation.
    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid(e),
        })?;

        let expires_at = OffsetDateTime::from_unix_timestamp(data.claims.exp).map_err(|_| SessionError::BadExpiry)?;
        Ok(Session { user_id: data.claims.sub, email: data.claims.email, expires_at })
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
