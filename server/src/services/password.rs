//! Password hashing and verification using Argon2id.
//!
//! Hashes are stored as PHC strings, so the parameters travel with each hash
//! and verification keeps working after the policy changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        // OWASP baseline for Argon2id.
        Self { memory_cost: 19 * 1024, time_cost: 2, parallelism: 1 }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub const fn memory_cost(mut self, kib: u32) -> Self {
        self.memory_cost = kib;
        self
    }

    #[must_use]
    pub const fn time_cost(mut self, iterations: u32) -> Self {
        self.time_cost = iterations;
        self
    }

    /// Minimal-cost policy for tests. Never use for real accounts.
    #[must_use]
    pub const fn insecure_fast() -> Self {
        Self { memory_cost: 64, time_cost: 1, parallelism: 1 }
    }

    fn build_params(self) -> Result<Params, PasswordError> {
        Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| PasswordError::Params(e.to_string()))
    }
}

/// Hashes and verifies passwords under a fixed [`PasswordPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordService {
    policy: PasswordPolicy,
}

impl PasswordService {
    #[must_use]
    pub const fn new(policy: PasswordPolicy) -> Self {
        Self { policy }
    }

    /// Hash a password with a fresh random salt, returning a PHC string.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is invalid or hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.policy.build_params()?);
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check `password` against a stored PHC hash.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::MalformedHash`] if the stored hash cannot be
    /// parsed. A wrong password is `Ok(false)`, not an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
