//! Runtime configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every setting has a development default so `cargo run` works out of the
//! box. Production (`APP_ENV=production`) is strict: a missing or short
//! `JWT_SECRET` is fatal instead of silently falling back.
//!
//! Parsing goes through a lookup closure so tests can feed a fixed map
//! instead of mutating the process environment.

use std::fmt;
use std::path::PathBuf;

use rand::Rng;
use time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_DAYS: i64 = 30;
pub const DEFAULT_REFRESH_HOURS: i64 = 24;
/// Upper bound for `SESSION_DAYS`; `SESSION_REFRESH_HOURS` is capped at the same span.
pub const MAX_SESSION_DAYS: i64 = 3650;
pub const DEFAULT_WEB_DIR: &str = "web";

/// Shortest `JWT_SECRET` accepted in production, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("unknown APP_ENV: {0:?} (expected 'development' or 'production')")]
    UnknownEnvironment(String),
    #[error("JWT_SECRET must be set in production")]
    MissingJwtSecret,
    #[error("JWT_SECRET must be at least {min} bytes in production (got {0})", min = MIN_SECRET_LEN)]
    WeakJwtSecret(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

// =============================================================================
// AUTH CONFIG
// =============================================================================

/// Session, cookie and admin settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens.
    pub jwt_secret: Vec<u8>,
    /// Lifetime of a freshly issued session.
    pub session_ttl: Duration,
    /// Sessions expiring within this window are re-issued by the route guard.
    pub refresh_window: Duration,
    /// Email of the single admin account, compared case-insensitively.
    pub admin_email: Option<String>,
    /// Whether session cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
}

impl AuthConfig {
    /// Config with default lifetimes, no admin, and insecure cookies.
    #[must_use]
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            session_ttl: Duration::days(DEFAULT_SESSION_DAYS),
            refresh_window: Duration::hours(DEFAULT_REFRESH_HOURS),
            admin_email: None,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }

    /// True when `email` is the configured admin account.
    #[must_use]
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .field("refresh_window", &self.refresh_window)
            .field("admin_email", &self.admin_email)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    /// Postgres URL. `None` selects the in-memory user store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Directory holding the built front-end.
    pub web_dir: PathBuf,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparsable values or a production setup
    /// without a strong `JWT_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = parse_environment(lookup("APP_ENV").as_deref())?;
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS)?;
        let web_dir = lookup("WEB_DIR").map_or_else(|| PathBuf::from(DEFAULT_WEB_DIR), PathBuf::from);

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) if environment.is_production() && secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::WeakJwtSecret(secret.len()));
            }
            Some(secret) => secret.into_bytes(),
            None if environment.is_production() => return Err(ConfigError::MissingJwtSecret),
            None => {
                tracing::warn!("JWT_SECRET not set; using a random per-process secret (sessions end on restart)");
                generate_secret()
            }
        };

        let session_days = parse_or("SESSION_DAYS", lookup("SESSION_DAYS"), DEFAULT_SESSION_DAYS)?;
        let refresh_hours = parse_or("SESSION_REFRESH_HOURS", lookup("SESSION_REFRESH_HOURS"), DEFAULT_REFRESH_HOURS)?;
        if !(1..=MAX_SESSION_DAYS).contains(&session_days) {
            return Err(ConfigError::InvalidValue { var: "SESSION_DAYS", value: session_days.to_string() });
        }
        if !(0..=MAX_SESSION_DAYS * 24).contains(&refresh_hours) {
            return Err(ConfigError::InvalidValue { var: "SESSION_REFRESH_HOURS", value: refresh_hours.to_string() });
        }

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue { var: "COOKIE_SECURE", value: raw })?,
            None => environment.is_production(),
        };

        let admin_email = lookup("ADMIN_EMAIL")
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty());

        let auth = AuthConfig {
            jwt_secret,
            session_ttl: Duration::days(session_days),
            refresh_window: Duration::hours(refresh_hours),
            admin_email,
            cookie_secure,
        };

        Ok(Self { environment, port, database_url, db_max_connections, web_dir, auth })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn parse_environment(raw: Option<&str>) -> Result<Environment, ConfigError> {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        None | Some("" | "development" | "dev") => Ok(Environment::Development),
        Some("production" | "prod") => Ok(Environment::Production),
        Some(other) => Err(ConfigError::UnknownEnvironment(other.to_owned())),
    }
}

/// 32 random bytes for a development-only signing secret.
fn generate_secret() -> Vec<u8> {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.to_vec()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
