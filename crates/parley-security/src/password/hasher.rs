//! Password hashing using Argon2.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2, Params,
};
use parley_core::{ParleyError, ParleyResult};
use std::sync::Arc;
use tracing::debug;

/// Password hasher service using Argon2.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Arc<Argon2<'static>>,
}

impl PasswordHasher {
    /// Creates a new password hasher with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(Params::DEFAULT)
    }

    /// Creates a new password hasher with custom parameters.
    #[must_use]
    pub fn with_params(params: Params) -> Self {
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
        Self {
            argon2: Arc::new(argon2),
        }
    }

    /// Creates a password hasher from a cost parameter (memory cost in MB).
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        let params = Params::new(
            cost * 1024, // Memory cost in KB
            3,           // Time cost (iterations)
            1,           // Parallelism
            None,        // Output length (default)
        )
        .unwrap_or(Params::DEFAULT);

        Self::with_params(params)
    }

    /// Hashes a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> ParleyResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ParleyError::Internal(format!("Failed to hash password: {}", e)))?;

        debug!("Password hashed successfully");
        Ok(hash.to_string())
    }

    /// Verifies a password against a hash.
    ///
    /// Returns `Ok(false)` for an incorrect password; a malformed hash
    /// string is an error so callers can decide how to treat it.
    pub fn verify(&self, password: &str, hash: &str) -> ParleyResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| ParleyError::Internal(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password verification failed: incorrect password");
                Ok(false)
            }
            Err(e) => Err(ParleyError::Internal(format!(
                "Password verification error: {}",
                e
            ))),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}
