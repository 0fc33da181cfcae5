//! One-way credential hashing with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so
//! the salt and cost travel with the value and verification never needs the
//! current configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version, ARGON2ID_IDENT,
};

use super::{config::HashCost, error::AuthError};

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    cost: HashCost,
}

impl CredentialHasher {
    /// Build a hasher for the given cost.
    ///
    /// # Errors
    /// Returns `AuthError::Misconfigured` if Argon2 rejects the parameters.
    pub fn new(cost: HashCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| AuthError::Misconfigured(format!("invalid hash cost: {err}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
        })
    }

    /// Hash a plaintext with a fresh random salt.
    ///
    /// # Errors
    /// Returns `AuthError::SigningFailure` if the hash cannot be computed.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::SigningFailure(format!("password hashing failed: {err}")))
    }

    /// Check a plaintext against a stored hash.
    ///
    /// Malformed or foreign hashes verify as `false`. The digest comparison is
    /// constant-time.
    #[must_use]
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`CredentialHasher::verify`] as a `Result`, for login paths.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidCredentials` on mismatch.
    pub fn check(&self, plaintext: &str, hash: &str) -> Result<(), AuthError> {
        if self.verify(plaintext, hash) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Whether a stored hash was made with other settings than the current ones
    /// and should be replaced after the next successful login.
    #[must_use]
    pub fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != ARGON2ID_IDENT || parsed.version != Some(Version::V0x13 as u32) {
            return true;
        }
        let Ok(params) = Params::try_from(&parsed) else {
            return true;
        };
        params.m_cost() != self.cost.memory_kib
            || params.t_cost() != self.cost.iterations
            || params.p_cost() != self.cost.parallelism
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
